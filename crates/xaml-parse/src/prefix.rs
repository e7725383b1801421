//! Prefix allocation for type names the parser writes into `Value` nodes.

use xaml_schema::XamlTypeName;
use xaml_tokenizer::TypeNameError;

use crate::context::ParserContext;

/// Maps every namespace of a type name to a prefix: one already in scope,
/// or a fresh `prefixN` that the caller must declare.
#[derive(Debug, Default)]
pub(crate) struct NamespacePrefixLookup {
    /// `(namespace, prefix)` for every namespace of the name.
    prefixes: Vec<(String, String)>,
    /// `(prefix, namespace)` pairs allocated here.
    new_definitions: Vec<(String, String)>,
}

impl NamespacePrefixLookup {
    pub(crate) fn new(ctx: &ParserContext<'_>, name: &XamlTypeName) -> Self {
        let mut lookup = Self::default();
        let mut next = 0usize;
        let mut pending = vec![name];
        while let Some(name) = pending.pop() {
            lookup.assign(ctx, &name.namespace, &mut next);
            pending.extend(name.type_arguments.iter().rev());
        }
        lookup
    }

    fn assign(&mut self, ctx: &ParserContext<'_>, namespace: &str, next: &mut usize) {
        if self.prefixes.iter().any(|(ns, _)| ns == namespace) {
            return;
        }
        let prefix = match ctx.find_prefix_for_namespace(namespace) {
            Some(prefix) => prefix,
            None => loop {
                let candidate = format!("prefix{next}");
                *next += 1;
                if ctx.find_namespace_by_prefix(&candidate).is_none() {
                    self.new_definitions
                        .push((candidate.clone(), namespace.to_string()));
                    break candidate;
                }
            },
        };
        self.prefixes.push((namespace.to_string(), prefix));
    }

    /// Prefixes that are not declared yet, in allocation order.
    pub(crate) fn new_definitions(&self) -> &[(String, String)] {
        &self.new_definitions
    }

    /// `name` rendered with the allocated prefixes.
    pub(crate) fn qualified_name(&self, name: &XamlTypeName) -> Result<String, TypeNameError> {
        name.to_qualified_string(|namespace| {
            self.prefixes
                .iter()
                .find(|(ns, _)| ns == namespace)
                .map(|(_, prefix)| prefix.clone())
        })
    }
}
