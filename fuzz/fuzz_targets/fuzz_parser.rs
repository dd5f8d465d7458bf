#![no_main]

use libfuzzer_sys::fuzz_target;
use trickle::Parser;

// Arbitrary bytes must never panic the parser; Malformed is the only
// acceptable failure, and a failed parser must keep refusing input.
fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::new();
    match parser.consume(data) {
        Ok(()) => {
            let _ = parser.get();
        }
        Err(first) => {
            let again = parser.consume(b"{}");
            assert_eq!(again, Err(first));
            let _ = parser.get();
        }
    }
});
