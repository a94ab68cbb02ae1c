//! Loadable module front end.
//!
//! Loading the module reserves CPU for the task named by its `pid`
//! parameter; unloading cancels that reservation. A reservation that cannot
//! be made is reported but does not fail the load.

use crate::{Kernel, ModuleParams, ReservationManager};
use keos::{KernelError, alert, info, timer::Timespec};

/// A loaded reservation module.
#[derive(Debug)]
pub struct ReservationModule {
    params: ModuleParams,
    reserved: bool,
}

impl ReservationModule {
    /// Loads the module.
    ///
    /// # Errors
    /// [`KernelError::InvalidArgument`] if `params` names no task.
    pub fn init<K: Kernel>(
        manager: &ReservationManager<K>,
        params: ModuleParams,
    ) -> Result<Self, KernelError> {
        if !params.has_pid() {
            alert!("Reservation Module: Invalid PID");
            return Err(KernelError::InvalidArgument);
        }

        let result = params.target().and_then(|tid| {
            manager.set_reservation(
                tid,
                Timespec::from(params.budget),
                Timespec::from(params.period),
            )
        });
        match result {
            Ok(()) => info!(
                "Reservation Module: Successfully set reservation for PID {}",
                params.pid
            ),
            Err(e) => alert!(
                "Reservation Module: Failed to set reservation for PID {}, error {}",
                params.pid,
                e.into_isize()
            ),
        }
        Ok(Self {
            params,
            reserved: result.is_ok(),
        })
    }

    /// The `pid` the module was loaded with.
    pub fn pid(&self) -> i64 {
        self.params.pid
    }

    /// Whether loading made a reservation.
    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    /// Unloads the module, cancelling the reservation of its task.
    ///
    /// Returns the outcome of the cancellation, which is also logged.
    pub fn exit<K: Kernel>(self, manager: &ReservationManager<K>) -> Result<(), KernelError> {
        let result = self
            .params
            .target()
            .and_then(|tid| manager.cancel_reservation(tid));
        match result {
            Ok(()) => info!(
                "Reservation Module: Successfully canceled reservation for PID {}",
                self.params.pid
            ),
            Err(e) => alert!(
                "Reservation Module: Failed to cancel reservation for PID {}, error {}",
                self.params.pid,
                e.into_isize()
            ),
        }
        result
    }
}
