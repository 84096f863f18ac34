//! The reserved `system.*` introspection surface.

use protocol::{RipcordError, Value, MULTICALL, MULTICALL_LOWER, SYSTEM_PREFIX};

use crate::registry::MethodRegistry;

pub(crate) const LIST_METHODS: &str = "system.listMethods";
pub(crate) const METHOD_HELP: &str = "system.methodHelp";
pub(crate) const METHOD_SIGNATURE: &str = "system.methodSignature";
pub(crate) const GET_CAPABILITIES: &str = "system.getCapabilities";

/// Names answered by the server itself.
pub(crate) const RESERVED: [&str; 6] = [
    GET_CAPABILITIES,
    LIST_METHODS,
    METHOD_HELP,
    METHOD_SIGNATURE,
    MULTICALL,
    MULTICALL_LOWER,
];

/// Returned by `system.methodSignature` when no signature was declared.
const UNDEFINED_SIGNATURE: &str = "undef";

/// Answers one reserved method. Returns `None` for names outside the
/// enumerated surface.
pub(crate) fn answer(
    registry: &MethodRegistry,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, RipcordError>> {
    if !method.starts_with(SYSTEM_PREFIX) {
        return None;
    }
    let result = match method {
        LIST_METHODS => Ok(list_methods(registry)),
        METHOD_HELP => target_name(method, args).and_then(|name| method_help(registry, name)),
        METHOD_SIGNATURE => {
            target_name(method, args).and_then(|name| method_signature(registry, name))
        }
        GET_CAPABILITIES => Ok(capabilities()),
        _ => return None,
    };
    Some(result)
}

fn target_name<'a>(method: &str, args: &'a [Value]) -> Result<&'a str, RipcordError> {
    args.first()
        .and_then(Value::as_str)
        .ok_or_else(|| RipcordError::InvalidArgument {
            code: protocol::codes::INVALID_METHOD_CALL,
            message: format!("{method} expects a method name"),
        })
}

fn list_methods(registry: &MethodRegistry) -> Value {
    let mut names: Vec<&str> = registry.names().collect();
    names.extend(RESERVED.iter().copied().filter(|name| !registry.contains(name)));
    names.sort_unstable();
    Value::Array(names.into_iter().map(Value::from).collect())
}

fn method_help(registry: &MethodRegistry, name: &str) -> Result<Value, RipcordError> {
    if RESERVED.contains(&name) {
        return Ok(Value::from(reserved_help(name)));
    }
    let method = registry
        .get(name)
        .ok_or_else(|| RipcordError::method_not_found(name))?;
    Ok(Value::from(method.help().unwrap_or_default()))
}

fn method_signature(registry: &MethodRegistry, name: &str) -> Result<Value, RipcordError> {
    if RESERVED.contains(&name) {
        return Ok(Value::from(UNDEFINED_SIGNATURE));
    }
    let method = registry
        .get(name)
        .ok_or_else(|| RipcordError::method_not_found(name))?;
    if method.signatures().is_empty() {
        return Ok(Value::from(UNDEFINED_SIGNATURE));
    }
    Ok(Value::Array(
        method
            .signatures()
            .iter()
            .map(|signature| {
                Value::Array(signature.iter().map(|t| Value::from(t.as_str())).collect())
            })
            .collect(),
    ))
}

fn reserved_help(name: &str) -> &'static str {
    match name {
        LIST_METHODS => "Lists the methods this server exposes.",
        METHOD_HELP => "Returns the help text of a method.",
        METHOD_SIGNATURE => "Returns the signatures of a method.",
        GET_CAPABILITIES => "Lists the specifications this server conforms to.",
        _ => "Executes a list of calls in one request and returns their results in order.",
    }
}

fn capabilities() -> Value {
    let spec = |url: &str, version: i64| -> Value {
        [("specUrl", Value::from(url)), ("specVersion", Value::Int(version))]
            .into_iter()
            .collect()
    };
    [
        ("xmlrpc", spec("http://www.xmlrpc.com/spec", 1)),
        (
            "system.multicall",
            spec("http://www.xmlrpc.com/discuss/msgReader$1208", 1),
        ),
        (
            "introspection",
            spec("http://xmlrpc.usefulinc.com/doc/reserved.html", 1),
        ),
        (
            "faults_interop",
            spec("http://xmlrpc-epi.sourceforge.net/specs/rfc.fault_codes.php", 20010516),
        ),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use protocol::{codes, Fault, WireType};

    use super::*;
    use crate::registry::MethodDescriptor;

    fn registry() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        registry
            .add_service(
                MethodDescriptor::new("add", |_: &[Value]| Ok(Value::Int(0)))
                    .help("Adds two integers.")
                    .signature([WireType::Int, WireType::Int, WireType::Int]),
                Some("math.add"),
            )
            .unwrap();
        registry
            .add_service(MethodDescriptor::new("ping", |_: &[Value]| Ok(Value::Nil)), None)
            .unwrap();
        registry
    }

    fn ask(method: &str, args: &[Value]) -> Result<Value, Fault> {
        answer(&registry(), method, args)
            .expect("reserved method")
            .map_err(Fault::from)
    }

    #[test]
    fn list_methods_includes_registered_and_reserved_names() {
        let listed = ask(LIST_METHODS, &[]).unwrap();
        let names: Vec<_> = listed
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(names.contains(&"math.add"));
        assert!(names.contains(&"ping"));
        assert!(names.contains(&"system.multiCall"));
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn method_help_and_signature_report_descriptor_metadata() {
        let name = [Value::from("math.add")];
        assert_eq!(ask(METHOD_HELP, &name).unwrap(), Value::from("Adds two integers."));
        assert_eq!(
            ask(METHOD_SIGNATURE, &name).unwrap(),
            Value::Array(vec![Value::Array(vec![Value::from("int"); 3])])
        );
        assert_eq!(
            ask(METHOD_SIGNATURE, &[Value::from("ping")]).unwrap(),
            Value::from("undef")
        );
        assert_eq!(ask(METHOD_HELP, &[Value::from("ping")]).unwrap(), Value::from(""));
    }

    #[test]
    fn introspecting_an_unknown_method_is_not_found() {
        let fault = ask(METHOD_HELP, &[Value::from("nope")]).unwrap_err();
        assert_eq!(fault.code, codes::METHOD_NOT_FOUND);
        assert_eq!(fault.message, "Method nope not found.");
    }

    #[test]
    fn capabilities_advertise_multicall() {
        let capabilities = ask(GET_CAPABILITIES, &[]).unwrap();
        assert!(capabilities.get("system.multicall").is_some());
    }

    #[test]
    fn unknown_system_names_are_left_to_the_caller() {
        assert!(answer(&registry(), "system.shutdown", &[]).is_none());
        assert!(answer(&registry(), "math.add", &[]).is_none());
    }
}
