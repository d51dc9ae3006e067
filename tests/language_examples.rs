//! End-to-end pipeline tests built from the worked examples: each source string is lexed, parsed,
//! type checked, and evaluated through [`test_utils::run_source`], mirroring the teacher's
//! black-box `tests/*.rs` fixtures (`hello.rs`, `mutable.rs`, …) but driving the library directly
//! instead of spawning a compiled binary, since Lumen has none.

use lumen::evaluator::value::Value;

#[test]
fn arithmetic_widens_integer_to_double() {
    let value = test_utils::check_runs("1 + 2 * 3;");
    assert!(matches!(value, Value::Integer(7)));
}

#[test]
fn closures_capture_and_curry() {
    let value = test_utils::check_runs(
        r#"
        let add = (a: Integer) => (b: Integer) => a + b;
        let addFive = add(5);
        addFive(3);
        "#,
    );
    assert!(matches!(value, Value::Integer(8)));
}

#[test]
fn sum_type_pattern_match_with_exhaustiveness() {
    let value = test_utils::check_runs(
        r#"
        type Shape = Square(Integer) | Circle(Integer);
        let area = (s) => match (s) { Square(n) => n * n, Circle(r) => 3 * r * r };
        area(Square(4));
        "#,
    );
    assert!(matches!(value, Value::Integer(16)));
}

#[test]
fn result_propagation_via_question_mark() {
    let value = test_utils::check_runs(
        r#"
        let half = (n: Integer) -> Result<Integer, String> => {
            if n % 2 == 0: Ok(n / 2) else: Err("odd");
        };
        let twice = (n: Integer) -> Result<Integer, String> => {
            let h = half(n)?;
            Ok(h + h);
        };
        match (twice(10)) { Ok(v) => v, Err(m) => 0 };
        "#,
    );
    assert!(matches!(value, Value::Integer(10)));
}

#[test]
fn trait_method_dispatch_on_a_record() {
    let value = test_utils::check_runs(
        r#"
        trait Greet { fn hello(self) -> String; }
        record Dog(name: String);
        impl Greet for Dog { fn hello(self) -> String => strFormat("woof, {?}", self.name); }
        Dog("rex").hello();
        "#,
    );
    match value {
        Value::String(s) => assert_eq!(s, "woof, rex"),
        other => panic!("expected a String, got {other:?}"),
    }
}

#[test]
fn pipe_chaining_through_map_and_reduce() {
    let value = test_utils::check_runs(
        r#"
        let double = (x) => x * 2;
        [1, 2, 3] |> map(double) |> reduce(0, (a, b) => a + b);
        "#,
    );
    assert!(matches!(value, Value::Integer(12)));
}

#[test]
fn mutable_reassignment_is_visible_across_calls() {
    let value = test_utils::check_runs(
        r#"
        let mut counter = 0;
        let bump = () => { counter = counter + 1; };
        bump();
        bump();
        counter;
        "#,
    );
    assert!(matches!(value, Value::Integer(2)));
}

#[test]
fn immutable_assignment_is_rejected_by_the_checker() {
    let message = test_utils::check_fails("let x = 1; x = 2;");
    assert!(message.contains("immutable"), "unexpected message: {message}");
}

#[test]
fn unknown_identifier_is_rejected_by_the_checker() {
    let message = test_utils::check_fails("thisNameDoesNotExist + 1;");
    assert!(message.to_lowercase().contains("unknown") || message.to_lowercase().contains("identifier"), "unexpected message: {message}");
}

#[test]
fn record_field_access_and_mutation_is_observable_through_aliasing() {
    let value = test_utils::check_runs(
        r#"
        record Counter(count: Integer);
        let c = Counter(0);
        let alias = c;
        alias.count = alias.count + 1;
        c.count;
        "#,
    );
    assert!(matches!(value, Value::Integer(1)));
}

#[test]
fn when_mixes_predicate_and_equality_arms_against_a_subject() {
    let value = test_utils::check_runs(
        r#"
        let classify = (n: Integer) -> String => when (n) {
            | 0 => "zero",
            | n > 0 => "pos",
            else => "neg",
        };
        classify(7);
        "#,
    );
    match value {
        Value::String(s) => assert_eq!(s, "pos"),
        other => panic!("expected a String, got {other:?}"),
    }
}

#[test]
fn declared_return_type_rejects_a_narrower_actual_value() {
    let message = test_utils::check_fails("let f = () -> Integer => 1.5;");
    assert!(message.to_lowercase().contains("unify") || message.to_lowercase().contains("cannot"), "unexpected message: {message}");
}
