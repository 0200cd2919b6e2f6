//! Error types, via error-chain.
//!
//! `InvalidWord` is raised when a bit word has the wrong length or a
//! character outside '0'/'1'; validation happens before any pin is
//! touched, so a rejected word leaves the register contents untouched.
//! `InvalidConfig` covers an impossible setup, e.g. a chip count of zero
//! or an operation on a line that is not wired.

error_chain! {
    foreign_links {
        Gpio(::sysfs_gpio::Error);
    }

    errors {
        InvalidWord(word: String, expected: usize) {
            description("invalid bit word")
            display("invalid bit word {:?}: expected exactly {} characters from '0'/'1'", word, expected)
        }
        InvalidConfig(reason: String) {
            description("invalid shift register configuration")
            display("invalid shift register configuration: {}", reason)
        }
    }
}
