//! Command implementations for nativemem-cmd

use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use nativemem::Window;

use crate::utils::WindowSummary;

pub mod hybrid;
pub mod native;
pub mod pinned;

/// Element type of the allocated window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Element {
    U8,
    I32,
    U64,
    F32,
    F64,
}

/// Allocation request shared by all commands.
#[derive(Args, Clone, Debug)]
pub struct AllocArgs {
    /// Number of elements to allocate
    #[arg(short, long, default_value_t = 10)]
    pub length: usize,

    /// Required byte alignment of the window (0 for the natural alignment)
    #[arg(short, long, default_value_t = 0)]
    pub alignment: usize,

    /// Zero the memory on allocation
    #[arg(short, long)]
    pub zeroed: bool,

    /// Set every element to this value after allocation
    #[arg(short, long)]
    pub fill: Option<String>,

    /// Element type
    #[arg(short, long, value_enum, default_value_t = Element::I32)]
    pub element: Element,
}

/// Output options shared by all commands.
#[derive(Args, Clone, Debug)]
pub struct OutputArgs {
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Maximum number of element values to print
    #[arg(long, default_value_t = 32)]
    pub max_values: usize,
}

/// An element type the commands can allocate, parse and print.
pub trait CmdElement:
    bytemuck::Pod + FromStr<Err: std::error::Error + Send + Sync + 'static> + Display
{
    const NAME: &'static str;
}

macro_rules! impl_cmd_element {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(impl CmdElement for $ty {
            const NAME: &'static str = $name;
        })*
    };
}

impl_cmd_element!(u8 => "u8", i32 => "i32", u64 => "u64", f32 => "f32", f64 => "f64");

/// Invokes `$run::<T>($args...)` with `T` selected by the element type.
macro_rules! with_element {
    ($element:expr, $run:ident($($args:expr),* $(,)?)) => {
        match $element {
            $crate::commands::Element::U8 => $run::<u8>($($args),*),
            $crate::commands::Element::I32 => $run::<i32>($($args),*),
            $crate::commands::Element::U64 => $run::<u64>($($args),*),
            $crate::commands::Element::F32 => $run::<f32>($($args),*),
            $crate::commands::Element::F64 => $run::<f64>($($args),*),
        }
    };
}

pub(crate) use with_element;

/// Parses the `--fill` value, if any, as `T`.
pub fn parse_fill<T: CmdElement>(fill: Option<&str>) -> Result<Option<T>> {
    fill.map(|s| {
        s.parse::<T>()
            .with_context(|| format!("invalid {} fill value '{s}'", T::NAME))
    })
    .transpose()
}

/// Collects the summary of an initialized window.
///
/// # Safety
///
/// `window` must be live and initialized while this function runs.
pub unsafe fn summarize<T: CmdElement>(
    strategy: &'static str,
    window: Window<T>,
    alignment: usize,
    output: &OutputArgs,
) -> WindowSummary {
    let values = unsafe { window.iter() }
        .take(output.max_values)
        .map(|v| v.to_string())
        .collect();
    WindowSummary::new::<T>(strategy, window, alignment, Some(values))
}
