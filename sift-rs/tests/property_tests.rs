use proptest::prelude::*;
use sift::expr::{evaluate, parse_expr, sanitize, tokenize, RawContext, RawValue, Value};

proptest! {
    /// The lexer and parser return Ok or Err on arbitrary input but never
    /// panic.
    #[test]
    fn parser_does_not_panic(s in "\\PC*") {
        let _ = tokenize(&s);
        let _ = parse_expr(&s);
    }
}

proptest! {
    /// Expression-shaped noise: operators, brackets and literals in random
    /// order still never panic, and never overflow the stack.
    #[test]
    fn expression_noise_does_not_panic(s in "[a-z0-9 .+*/%!?:()\\[\\]<>=&|'-]{0,200}") {
        if let Ok(ast) = parse_expr(&s) {
            let _ = evaluate(&ast, &sanitize(&RawContext::new()));
        }
    }
}

fn literal() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<i32>().prop_map(|n| n.to_string()),
        (0u32..1_000, 1u32..100).prop_map(|(a, b)| format!("{a}.{b}")),
        "[a-z ]{0,8}".prop_map(|s| format!("'{s}'")),
        Just("true".to_owned()),
        Just("false".to_owned()),
        Just("null".to_owned()),
        Just("missing".to_owned()),
        Just("(0 / 1 % 0)".to_owned()),
    ]
}

proptest! {
    /// `!(e)` is always the negated truthiness of `e`.
    #[test]
    fn negation_matches_truthiness(e in literal()) {
        let ctx = sanitize(&RawContext::new());
        let value = evaluate(&parse_expr(&e).unwrap(), &ctx).unwrap();
        let negated = evaluate(&parse_expr(&format!("!({e})")).unwrap(), &ctx).unwrap();
        prop_assert_eq!(negated, Value::Bool(!value.truthy()));
    }
}

proptest! {
    /// Sanitized contexts hold only safe keys, no callables, and capped
    /// key and element counts.
    #[test]
    fn sanitizer_caps_and_filters(
        keys in prop::collection::vec("(__)?k[a-z]{0,60}", 0..80),
        len in 0usize..1_500,
    ) {
        let mut raw = RawContext::new();
        raw.insert("items".into(), RawValue::from(vec![RawValue::from(0i64); len]));
        raw.insert("handler".into(), RawValue::function(|_| Value::Null));
        for k in &keys {
            raw.insert(k.clone(), RawValue::from(1i64));
        }

        let ctx = sanitize(&raw);
        prop_assert!(ctx.len() <= 50);
        prop_assert!(ctx.get("handler").is_none());
        for (k, _) in ctx.iter() {
            prop_assert!(sift::expr::is_safe_key(k), "unsafe key {}", k);
        }
        match ctx.get("items") {
            Some(Value::List(items)) => prop_assert_eq!(items.len(), len.min(1_000)),
            other => prop_assert!(false, "items missing: {:?}", other),
        }
    }
}
