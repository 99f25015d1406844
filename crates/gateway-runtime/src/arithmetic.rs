//! Built-in `arithmetic` service, served when no definition file is given.

use anyhow::{anyhow, Result};
use rpc_gateway::{number_arg, GatewayBuilder, GatewayError};
use serde_json::{json, Value};
use shared_types::{MethodSpec, ParamSpec, ParamType, ReturnInfo, ServiceDefinition, ServiceInfo};
use std::collections::BTreeMap;

/// `arithmetic.add(first, second)` and `arithmetic.subtract(first, second)`.
pub fn definition() -> ServiceDefinition {
    let binary = |description: &str| MethodSpec {
        params: BTreeMap::from([
            ("first".to_string(), number_param(1)),
            ("second".to_string(), number_param(2)),
        ]),
        return_info: ReturnInfo {
            kind: ParamType::Number,
            description: None,
        },
        description: Some(description.to_string()),
    };

    let mut definition = ServiceDefinition::new();
    definition.insert(
        "arithmetic",
        ServiceInfo {
            methods: BTreeMap::from([
                ("add".to_string(), binary("first + second")),
                ("subtract".to_string(), binary("first - second")),
            ]),
            description: Some("Integer and floating point arithmetic".to_string()),
        },
    );
    definition
}

fn number_param(order: u32) -> ParamSpec {
    ParamSpec {
        order,
        kind: ParamType::Number,
        optional: false,
        default_value: None,
        description: None,
    }
}

/// Register `add` and `subtract`.
pub fn register(builder: &mut GatewayBuilder) -> Result<(), GatewayError> {
    builder
        .register_handler("add", add)?
        .register_handler("subtract", subtract)?;
    Ok(())
}

pub fn add(args: &[Value]) -> Result<Value> {
    binary_op(args, i64::checked_add, |a, b| a + b)
}

pub fn subtract(args: &[Value]) -> Result<Value> {
    binary_op(args, i64::checked_sub, |a, b| a - b)
}

/// Integer arithmetic when both operands are integers, float otherwise.
fn binary_op(
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let ints = (
        args.first().and_then(Value::as_i64),
        args.get(1).and_then(Value::as_i64),
    );
    if let (Some(a), Some(b)) = ints {
        return int_op(a, b)
            .map(|n| json!(n))
            .ok_or_else(|| anyhow!("integer overflow"));
    }
    Ok(json!(float_op(number_arg(args, 0)?, number_arg(args, 1)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_is_valid() {
        let definition = definition();
        definition.validate().unwrap();

        let add = definition.method("arithmetic", "add").unwrap();
        let order: Vec<_> = add.ordered_params().into_iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["first", "second"]);
        assert!(definition.method("arithmetic", "subtract").is_some());
    }

    #[test]
    fn test_integer_results_stay_integers() {
        assert_eq!(add(&[json!(2), json!(3)]).unwrap(), json!(5));
        assert_eq!(subtract(&[json!(2), json!(3)]).unwrap(), json!(-1));
    }

    #[test]
    fn test_float_operands() {
        assert_eq!(add(&[json!(1.5), json!(2)]).unwrap(), json!(3.5));
    }

    #[test]
    fn test_bad_operands_fail() {
        assert!(add(&[json!("two"), json!(3)]).is_err());
        assert!(add(&[json!(1), Value::Null]).is_err());
        assert!(add(&[json!(i64::MAX), json!(1)]).is_err());
    }
}
