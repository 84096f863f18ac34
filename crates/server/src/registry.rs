//! Capability descriptors and the method registry.
//!
//! Integrators describe what a server exposes with [`Capability`] values:
//! either a single [`MethodDescriptor`] or a [`ServiceDescriptor`] grouping
//! several members. [`MethodRegistry::add_service`] flattens them into a map
//! from public RPC method name to invocable target.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use protocol::{Fault, MethodName, Namespace, RipcordError, Value, WireType};
use tracing::debug;

/// The invocable behind a registered method.
pub type Target = Arc<dyn Fn(&[Value]) -> Result<Value, Fault> + Send + Sync>;

/// Whether a service member may be published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Published when its service is registered.
    #[default]
    Public,
    /// Never published through a service.
    Protected,
    /// Never published through a service.
    Private,
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// One invocable capability plus the metadata reported by introspection.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    target: Target,
    visibility: Visibility,
    help: Option<String>,
    signatures: Vec<Vec<WireType>>,
}

impl MethodDescriptor {
    /// Describes `target` under the member name `name`.
    pub fn new<F>(name: impl Into<String>, target: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            target: Arc::new(target),
            visibility: Visibility::Public,
            help: None,
            signatures: Vec::new(),
        }
    }

    /// Describes an unnamed invocable. It must be registered under an
    /// explicit namespace.
    pub fn anonymous<F>(target: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::new(String::new(), target)
    }

    /// Sets the member's visibility.
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the text returned by `system.methodHelp`.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Adds a signature reported by `system.methodSignature`: the return
    /// type followed by the parameter types.
    pub fn signature(mut self, signature: impl IntoIterator<Item = WireType>) -> Self {
        self.signatures.push(signature.into_iter().collect());
        self
    }

    /// The member name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn is_published(&self) -> bool {
        self.visibility == Visibility::Public && !self.name.starts_with('_')
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("help", &self.help)
            .field("signatures", &self.signatures)
            .finish_non_exhaustive()
    }
}

/// A group of members registered together.
#[derive(Debug, Clone, Default)]
pub struct ServiceDescriptor {
    members: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    /// Creates an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member.
    pub fn member(mut self, member: MethodDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// The members, published or not.
    pub fn members(&self) -> &[MethodDescriptor] {
        &self.members
    }
}

/// Something a server can expose.
#[derive(Debug, Clone)]
pub enum Capability {
    /// A single invocable.
    Method(MethodDescriptor),
    /// A group of members.
    Service(ServiceDescriptor),
}

impl From<MethodDescriptor> for Capability {
    fn from(method: MethodDescriptor) -> Self {
        Self::Method(method)
    }
}

impl From<ServiceDescriptor> for Capability {
    fn from(service: ServiceDescriptor) -> Self {
        Self::Service(service)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A published method.
#[derive(Clone)]
pub struct RegisteredMethod {
    pub(crate) target: Target,
    help: Option<String>,
    signatures: Vec<Vec<WireType>>,
}

impl RegisteredMethod {
    /// Help text, if any was supplied.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Declared signatures; empty when none were supplied.
    pub fn signatures(&self) -> &[Vec<WireType>] {
        &self.signatures
    }
}

impl From<MethodDescriptor> for RegisteredMethod {
    fn from(descriptor: MethodDescriptor) -> Self {
        Self {
            target: descriptor.target,
            help: descriptor.help,
            signatures: descriptor.signatures,
        }
    }
}

/// Map from public RPC method name to target. Names are unique; registering
/// a name again replaces the earlier entry.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: BTreeMap<MethodName, RegisteredMethod>,
}

impl MethodRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a capability.
    ///
    /// A [`Capability::Method`] is registered under `namespace` when one is
    /// given, otherwise under its own name. A [`Capability::Service`]
    /// registers each public member whose name does not start with `_` as
    /// `namespace.member`; an absent or purely numeric namespace adds no
    /// prefix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` (`UNKNOWN_SERVICE_TYPE`) when a method ends
    /// up without a usable name.
    pub fn add_service(
        &mut self,
        capability: impl Into<Capability>,
        namespace: Option<&str>,
    ) -> Result<(), RipcordError> {
        let namespace = namespace.map(str::trim).filter(|ns| !ns.is_empty());
        match capability.into() {
            Capability::Method(method) => {
                let name = namespace.unwrap_or(method.name()).to_string();
                self.add_method(&name, method)
            }
            Capability::Service(service) => {
                let prefix = namespace
                    .filter(|ns| !is_numeric(ns))
                    .map(|ns| {
                        Namespace::new(ns).ok_or_else(|| RipcordError::unknown_service_type(ns))
                    })
                    .transpose()?;
                for member in service.members.into_iter().filter(MethodDescriptor::is_published) {
                    let name = match &prefix {
                        Some(prefix) => prefix.qualify(member.name()),
                        None => MethodName::new(member.name()),
                    }
                    .ok_or_else(|| RipcordError::unknown_service_type(member.name()))?;
                    self.insert(name, member);
                }
                Ok(())
            }
        }
    }

    /// Registers one method under `name`, whatever its visibility.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` (`UNKNOWN_SERVICE_TYPE`) when `name` is
    /// empty or contains whitespace.
    pub fn add_method(&mut self, name: &str, method: MethodDescriptor) -> Result<(), RipcordError> {
        let name = MethodName::new(name).ok_or_else(|| RipcordError::unknown_service_type(name))?;
        self.insert(name, method);
        Ok(())
    }

    fn insert(&mut self, name: MethodName, method: MethodDescriptor) {
        let replaced = self.methods.insert(name.clone(), method.into()).is_some();
        debug!(method = %name, replaced, "method registered");
    }

    /// Looks up a method by its public name.
    pub fn get(&self, name: &str) -> Option<&RegisteredMethod> {
        MethodName::new(name).and_then(|name| self.methods.get(&name))
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(MethodName::as_str)
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

fn is_numeric(namespace: &str) -> bool {
    namespace.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use protocol::codes;
    use rstest::rstest;

    use super::*;

    fn echo(name: &str) -> MethodDescriptor {
        MethodDescriptor::new(name, |args: &[Value]| {
            Ok(args.first().cloned().unwrap_or(Value::Nil))
        })
    }

    fn blog() -> ServiceDescriptor {
        ServiceDescriptor::new()
            .member(echo("getPosts"))
            .member(echo("_bar"))
            .member(echo("purge").visibility(Visibility::Private))
            .member(echo("audit").visibility(Visibility::Protected))
    }

    #[test]
    fn service_members_are_prefixed_and_non_public_ones_skipped() {
        let mut registry = MethodRegistry::new();
        registry.add_service(blog(), Some("blog")).unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), ["blog.getPosts"]);
        assert!(!registry.contains("blog._bar"));
        assert!(!registry.contains("blog.purge"));
    }

    #[rstest]
    #[case::absent(None)]
    #[case::numeric(Some("0"))]
    #[case::blank(Some("  "))]
    fn service_without_usable_namespace_is_merged_flat(#[case] namespace: Option<&str>) {
        let mut registry = MethodRegistry::new();
        registry.add_service(blog(), namespace).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["getPosts"]);
    }

    #[test]
    fn plain_method_registers_under_namespace_or_own_name() {
        let mut registry = MethodRegistry::new();
        registry.add_service(echo("ping"), None).unwrap();
        registry.add_service(echo("ignored"), Some("math.add")).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["math.add", "ping"]);
    }

    #[test]
    fn method_without_a_name_is_an_unknown_service_type() {
        let mut registry = MethodRegistry::new();
        let err = registry
            .add_service(MethodDescriptor::anonymous(|_: &[Value]| Ok(Value::Nil)), None)
            .unwrap_err();
        assert_eq!(err.code(), codes::UNKNOWN_SERVICE_TYPE);
        assert!(registry.is_empty());
    }

    #[test]
    fn re_adding_a_name_overwrites_it() {
        let mut registry = MethodRegistry::new();
        registry
            .add_method("answer", MethodDescriptor::anonymous(|_: &[Value]| Ok(Value::Int(1))))
            .unwrap();
        registry
            .add_method("answer", MethodDescriptor::anonymous(|_: &[Value]| Ok(Value::Int(42))))
            .unwrap();

        let target = &registry.get("answer").unwrap().target;
        assert_eq!(target(&[]), Ok(Value::Int(42)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn metadata_is_kept_for_introspection() {
        let mut registry = MethodRegistry::new();
        let add = echo("add")
            .help("Adds two integers.")
            .signature([WireType::Int, WireType::Int, WireType::Int]);
        registry.add_service(add, Some("math.add")).unwrap();

        let method = registry.get("math.add").unwrap();
        assert_eq!(method.help(), Some("Adds two integers."));
        assert_eq!(method.signatures(), [vec![WireType::Int; 3]]);
    }
}
