//! C++ emission of the decision tree and its surroundings.
//!
//! A dispatcher body is laid out as:
//!
//! ```text
//! int overloadId = -1;
//! int numArgs = ...;             // arguments initializer
//! // invalid argument lengths
//! // Overloaded function decisor
//! if (overloadId == -1) goto <dispatcher>_TypeError;
//! ...calls...
//! <dispatcher>_TypeError:        // error section
//! ```

use super::{ArityGuard, Branch, DecisorNode, OverloadDecisor};
use crate::conversion::check_expression;
use crate::signature::{c_string_literal, overload_listings};
use crate::writer::CodeWriter;

impl OverloadDecisor<'_> {
    // ==========================================================================
    // Arguments Initializer
    // ==========================================================================

    /// Unpack the dynamic arguments and reject impossible counts.
    ///
    /// `function_name` is the name shown by tuple-unpacking errors and
    /// `full_name` the dotted name used in count errors.
    pub fn emit_arguments_initializer(
        &self,
        w: &mut CodeWriter,
        function_name: &str,
        full_name: &str,
        error_label: &str,
        error_return: &str,
    ) {
        let max = self.max_args();
        let positional = self.positional_limit();
        let min = self.min_args();

        w.line("int numArgs = PyTuple_GET_SIZE(args);");
        let slots: Vec<String> = if self.uses_argument_list() {
            let zeros = vec!["0"; max].join(", ");
            w.line(format!("PyObject* pyargs[] = {{{zeros}}};"));
            (0..positional).map(|i| format!("&(pyargs[{i}])")).collect()
        } else {
            w.line("PyObject* arg = 0;");
            vec!["&arg".to_string()]
        };
        w.blank();

        if self.has_varargs() {
            w.line(format!("PyObject* nonvarargs = PyTuple_GetSlice(args, 0, {positional});"));
            w.line("Shiboken::AutoDecRef auto_nonvarargs(nonvarargs);");
            w.line(format!("pyargs[{positional}] = PyTuple_GetSlice(args, {positional}, numArgs);"));
            w.line(format!("Shiboken::AutoDecRef auto_varargs(pyargs[{positional}]);"));
            w.blank();
        }

        w.line("// invalid argument lengths");
        let mut chain = Vec::new();
        if self.uses_named_arguments() {
            if !self.is_reflected_constructor() && !self.has_varargs() {
                chain.push((
                    format!("numArgs + numNamedArgs > {positional}"),
                    format!("PyErr_SetString(PyExc_TypeError, \"{full_name}(): too many arguments\");"),
                ));
            }
            if min > 0 {
                chain.push((
                    format!("numArgs < {min}"),
                    format!("PyErr_SetString(PyExc_TypeError, \"{full_name}(): not enough arguments\");"),
                ));
            }
        }
        for (i, (condition, raise)) in chain.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "} else if" };
            w.line(format!("{keyword} ({condition}) {{"));
            w.indented(|w| {
                w.line(raise);
                w.line(format!("return {error_return};"));
            });
        }
        let invalid = self.invalid_argument_lengths();
        if !invalid.is_empty() {
            let condition: Vec<String> = invalid.iter().map(|n| format!("numArgs == {n}")).collect();
            let keyword = if chain.is_empty() { "if" } else { "} else if" };
            w.line(format!("{keyword} ({}) {{", condition.join(" || ")));
            w.indented(|w| w.line(format!("goto {error_label};")));
        }
        if !chain.is_empty() || !invalid.is_empty() {
            w.line("}");
        }
        w.blank();

        let source = if self.has_varargs() { "nonvarargs" } else { "args" };
        let slots = slots.join(", ");
        if self.uses_named_arguments() {
            let units = "O".repeat(positional);
            w.line(format!("if (!PyArg_ParseTuple({source}, \"|{units}:{function_name}\", {slots}))"));
        } else {
            w.line(format!(
                "if (!PyArg_UnpackTuple({source}, \"{function_name}\", {min}, {positional}, {slots}))"
            ));
        }
        w.indented(|w| w.line(format!("return {error_return};")));
        w.blank();
    }

    // ==========================================================================
    // Decisor
    // ==========================================================================

    /// The commented candidate list followed by the decision tree.
    pub fn emit_decisor(&self, w: &mut CodeWriter, error_label: &str) {
        w.line("// Overloaded function decisor");
        for (i, function) in self.group().functions.iter().enumerate() {
            w.line(format!("// {i}: {}", function.minimal_signature()));
        }
        self.emit_node(w, self.root());
        w.blank();
        w.line("// Function signature not found.");
        w.line(format!("if (overloadId == -1) goto {error_label};"));
        w.blank();
    }

    fn emit_selection(&self, w: &mut CodeWriter, index: usize) {
        w.line(format!(
            "overloadId = {index}; // {}",
            self.function(index).minimal_signature()
        ));
    }

    fn emit_node(&self, w: &mut CodeWriter, node: &DecisorNode) {
        let (reference, has_default_call) = self.default_call(node);
        if let Some(selected) = self.immediate_selection(node, reference, has_default_call) {
            self.emit_selection(w, selected);
            return;
        }

        let mut branches = 0;
        if has_default_call {
            w.line(format!("if (numArgs == {}) {{", node.next_position()));
            w.indented(|w| self.emit_selection(w, self.default_call_target(node, reference)));
            branches += 1;
        }
        for child in &node.children {
            let branch = self.branch(child);
            let keyword = if branches == 0 { "if" } else { "} else if" };
            w.line(format!("{keyword} ({}) {{", self.branch_condition(&branch)));
            w.indented(|w| self.emit_node(w, branch.target));
            branches += 1;
        }
        if branches > 0 {
            w.line("}");
        }
    }

    fn branch_condition(&self, branch: &Branch<'_>) -> String {
        let mut parts = Vec::new();
        match branch.guard {
            ArityGuard::None => {}
            ArityGuard::Exactly(n) => parts.push(format!("numArgs == {n}")),
            ArityGuard::AtLeast(n) => parts.push(format!("numArgs >= {n}")),
        }
        match branch.reverse {
            Some(true) => parts.push("isReverse".to_string()),
            Some(false) => parts.push("!isReverse".to_string()),
            None => {}
        }
        for node in &branch.checks {
            if let (Some(position), Some(check), Some(ty)) = (node.position, &node.check, &node.arg_type) {
                parts.push(check_expression(ty, check, &self.argument_source(position)));
            }
        }
        if parts.is_empty() {
            "true".to_string()
        } else {
            parts.join(" && ")
        }
    }

    // ==========================================================================
    // Error Section
    // ==========================================================================

    /// The `<dispatcher>_TypeError:` label raising the wrong-arguments error.
    pub fn emit_error_section(
        &self,
        w: &mut CodeWriter,
        error_label: &str,
        full_name: &str,
        verbose: bool,
        error_return: &str,
    ) {
        let args_var = if self.uses_argument_list() { "args" } else { "arg" };
        w.line(format!("{error_label}:"));
        w.indented(|w| {
            if verbose {
                let listings: Vec<String> = overload_listings(&self.group().functions)
                    .iter()
                    .map(|s| c_string_literal(s))
                    .collect();
                w.line(format!("const char* overloads[] = {{{}, 0}};", listings.join(", ")));
                w.line(format!(
                    "Shiboken::setErrorAboutWrongArguments({args_var}, \"{full_name}\", overloads);"
                ));
            } else {
                w.line(format!("Shiboken::setErrorAboutWrongArguments({args_var}, \"{full_name}\", 0);"));
            }
            w.line(format!("return {error_return};"));
        });
    }
}
