pub mod diffusion;
pub mod mass_conservation;

use crate::Error;

use common::progress::Progress;

fn check_cancel(progress: &dyn Progress) -> Result<(), Error> {
  if progress.check_cancel() {
    tracing::info!("run cancelled");
    Err(Error::Cancelled)
  } else {
    Ok(())
  }
}
