//! Common utilities for nativemem-cmd

use anyhow::Result;
use nativemem::Window;
use serde::Serialize;

use crate::commands::{CmdElement, OutputArgs};

/// Layout of one allocated window, as reported by every command.
#[derive(Serialize)]
pub struct WindowSummary {
    pub strategy: &'static str,
    pub element: &'static str,
    pub address: String,
    pub length: usize,
    pub byte_len: usize,
    /// Requested alignment; 0 means the allocator's natural alignment.
    pub alignment: usize,
    /// Largest power of two (up to 4096) dividing the address.
    pub address_alignment: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owns_allocation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl WindowSummary {
    pub fn new<T: CmdElement>(
        strategy: &'static str,
        window: Window<T>,
        alignment: usize,
        values: Option<Vec<String>>,
    ) -> WindowSummary {
        WindowSummary {
            strategy,
            element: T::NAME,
            address: format!("{:p}", window.as_ptr()),
            length: window.len(),
            byte_len: window.byte_len(),
            alignment,
            address_alignment: address_alignment(window.addr()),
            owns_allocation: None,
            array_length: None,
            values,
        }
    }

    /// Prints the summary either as pretty JSON or as plain text.
    pub fn print(&self, output: &OutputArgs) -> Result<()> {
        if output.json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }

        println!("strategy:          {}", self.strategy);
        println!("element:           {}", self.element);
        println!("address:           {}", self.address);
        println!("length:            {}", self.length);
        println!("size:              {}", format_size(self.byte_len as u64));
        println!("alignment:         {}", self.alignment);
        println!("address alignment: {}", self.address_alignment);
        if let Some(owns) = self.owns_allocation {
            println!("owns allocation:   {owns}");
        }
        if let Some(array_length) = self.array_length {
            println!("array length:      {array_length}");
        }
        match &self.values {
            Some(values) => {
                for value in values {
                    println!("{value}");
                }
                if values.len() < self.length {
                    println!("... ({} more)", self.length - values.len());
                }
            }
            None => println!("(contents uninitialized; pass --zeroed or --fill to print values)"),
        }
        Ok(())
    }
}

/// Largest power of two, capped at 4096, that divides `addr`.
pub fn address_alignment(addr: usize) -> usize {
    const CAP: usize = 4096;
    if addr == 0 {
        return CAP;
    }
    (1usize << addr.trailing_zeros().min(CAP.trailing_zeros())).min(CAP)
}

/// Formats a byte count in human-readable form
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_alignment() {
        assert_eq!(address_alignment(0x1000), 4096);
        assert_eq!(address_alignment(0x10040), 64);
        assert_eq!(address_alignment(0x10001), 1);
        assert_eq!(address_alignment(0), 4096);
        assert_eq!(address_alignment(0x100000), 4096);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(40), "40 B");
        assert_eq!(format_size(2048), "2.00 KB");
    }
}
