pub mod report;
pub mod sequence;
pub mod status;

use anyhow::{Result, bail};

use crate::pipeline::pipe::Toolchain;
use crate::util::command_available;

pub(crate) fn ensure_toolchain(toolchain: &Toolchain) -> Result<()> {
    for program in toolchain.programs() {
        if !command_available(program) {
            bail!("required tool '{program}' was not found on PATH");
        }
    }
    Ok(())
}
