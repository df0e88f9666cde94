//! Hybrid command implementation

use anyhow::{Context, Result};
use nativemem::{HybridAllocation, NativeAllocation};

use crate::commands::{AllocArgs, CmdElement, OutputArgs, parse_fill, summarize, with_element};
use crate::utils::WindowSummary;

pub fn run(existing: usize, alloc: AllocArgs, output: OutputArgs) -> Result<()> {
    with_element!(alloc.element, run_typed(existing, &alloc, &output))
}

fn run_typed<T: CmdElement>(existing: usize, args: &AllocArgs, output: &OutputArgs) -> Result<()> {
    let fill = parse_fill::<T>(args.fill.as_deref())?;

    // The buffer offered for reuse is allocated with the requested alignment,
    // since reused buffers are expected to be aligned already.
    let backing = NativeAllocation::<T>::new(existing, true, args.alignment)
        .with_context(|| format!("Failed to allocate the existing buffer of {existing} elements"))?;

    let mut hybrid = unsafe {
        HybridAllocation::from_window(backing.window(), args.length, args.zeroed, args.alignment)
    }
    .with_context(|| format!("Failed to set up a hybrid allocation of {}", args.length))?;
    if let Some(value) = fill {
        hybrid.fill(value);
    }

    let mut summary = if hybrid.is_initialized() {
        unsafe { summarize("hybrid", hybrid.window(), args.alignment, output) }
    } else {
        WindowSummary::new::<T>("hybrid", hybrid.window(), args.alignment, None)
    };
    summary.owns_allocation = Some(hybrid.owns_allocation());
    summary.print(output)?;

    drop(hybrid);
    drop(backing);
    Ok(())
}
