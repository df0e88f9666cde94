//! Native command implementation

use anyhow::{Context, Result};
use nativemem::NativeAllocation;

use crate::commands::{AllocArgs, CmdElement, OutputArgs, parse_fill, summarize, with_element};
use crate::utils::WindowSummary;

pub fn run(alloc: AllocArgs, output: OutputArgs) -> Result<()> {
    with_element!(alloc.element, run_typed(&alloc, &output))
}

fn run_typed<T: CmdElement>(args: &AllocArgs, output: &OutputArgs) -> Result<()> {
    let fill = parse_fill::<T>(args.fill.as_deref())?;
    let mut alloc = NativeAllocation::<T>::new(args.length, args.zeroed, args.alignment)
        .with_context(|| format!("Failed to allocate {} {} elements", args.length, T::NAME))?;
    if let Some(value) = fill {
        alloc.fill(value);
    }

    let summary = if alloc.is_initialized() {
        unsafe { summarize("native", alloc.window(), args.alignment, output) }
    } else {
        WindowSummary::new::<T>("native", alloc.window(), args.alignment, None)
    };
    summary.print(output)
}
