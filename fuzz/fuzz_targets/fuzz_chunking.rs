#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trickle::Parser;

#[derive(Arbitrary, Debug)]
struct Case {
    data: Vec<u8>,
    cuts: Vec<u8>,
}

// Feeding the same bytes whole or in arbitrary slices must agree on
// success, and on success must materialize the same snapshot.
fuzz_target!(|case: Case| {
    let mut whole = Parser::new();
    let whole_result = whole.consume(&case.data);

    let mut chunked = Parser::new();
    let mut rest: &[u8] = &case.data;
    let mut chunked_result = Ok(());
    for cut in case.cuts {
        let at = (cut as usize).min(rest.len());
        let (head, tail) = rest.split_at(at);
        chunked_result = chunked.consume(head);
        if chunked_result.is_err() {
            break;
        }
        rest = tail;
    }
    if chunked_result.is_ok() {
        chunked_result = chunked.consume(rest);
    }

    assert_eq!(whole_result.is_ok(), chunked_result.is_ok());
    if whole_result.is_ok() {
        assert_eq!(whole.get(), chunked.get());
    }
});
