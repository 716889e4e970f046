//! Numeric one-time code generation

use rand::{rngs::OsRng, Rng};

use otp_shared::config::otp::{MAX_CODE_LENGTH, MIN_CODE_LENGTH};

/// Default number of digits in a code
pub const CODE_LENGTH: usize = 6;

/// Generates fixed-length numeric codes from the OS random source
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    /// Create a generator; the length is clamped to the supported range
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Draw a code uniformly from `0..10^length`, zero-padded
    pub fn generate(&self) -> String {
        let upper = 10u64.pow(self.length as u32);
        let value = OsRng.gen_range(0..upper);
        format!("{:0width$}", value, width = self.length)
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(CODE_LENGTH)
    }
}

/// Generate a single code of `length` digits
pub fn generate_code(length: usize) -> String {
    CodeGenerator::new(length).generate()
}
