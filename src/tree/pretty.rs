use super::{Ast, NodeIx};

/// Width of one indentation level.
const INDENT: usize = 2;

impl Ast {
    /// Renders the tree for humans.
    ///
    /// Nodes whose type satisfies `is_body_type` list their children on
    /// indented lines; every other node renders inline as
    /// `type[value](child, ...)`. Values are shown only with `show_values`.
    pub fn pretty_print(&self, show_values: bool, is_body_type: &dyn Fn(&str) -> bool) -> String {
        let mut out = String::new();
        self.write_pretty(self.root(), 0, show_values, is_body_type, &mut out);
        out
    }

    /// Writes one node and, recursively, its children.
    fn write_pretty(
        &self,
        ix: NodeIx,
        indent: usize,
        show_values: bool,
        is_body_type: &dyn Fn(&str) -> bool,
        out: &mut String,
    ) {
        out.push_str(self.node_type(ix));
        if show_values {
            if let Some(value) = self.value(ix) {
                out.push('[');
                out.push_str(value);
                out.push(']');
            }
        }

        let children = self.children(ix);
        if children.is_empty() {
            return;
        }

        if is_body_type(self.node_type(ix)) {
            out.push(':');
            for &child in children {
                out.push('\n');
                out.push_str(&" ".repeat(indent + INDENT));
                self.write_pretty(child, indent + INDENT, show_values, is_body_type, out);
            }
        } else {
            out.push('(');
            for (i, &child) in children.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                self.write_pretty(child, indent, show_values, is_body_type, out);
            }
            out.push(')');
        }
    }
}
