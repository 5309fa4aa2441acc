use super::ensure_sufficient_stack;

fn nest(depth: u32) -> u32 {
    ensure_sufficient_stack(|| if depth == 0 { 0 } else { nest(depth - 1) + 1 })
}

#[test]
fn passes_through_the_closure_result() {
    assert_eq!(ensure_sufficient_stack(|| "done"), "done");
}

#[test]
fn survives_nesting_deeper_than_a_default_thread_stack() {
    assert_eq!(nest(200_000), 200_000);
}

#[test]
fn propagates_errors_unchanged() {
    let result: Result<u8, String> = ensure_sufficient_stack(|| Err("unterminated".to_string()));
    assert_eq!(result, Err("unterminated".to_string()));
}
