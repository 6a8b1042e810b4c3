//! Source text rendering of emission trees.
//!
//! The rendered text is what gets persisted next to the executable program
//! in a template file, so generated code can be read and diffed.

use crate::ast::{Callee, EmissionNode, Failure, Literal, Program, Routine};

const INDENT: &str = "    ";

/// Buffered writer with indentation tracking
pub struct Compiler {
    output: String,
    indent: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            output: String::with_capacity(4096),
            indent: 0,
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write one indented line
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str(INDENT);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    pub fn finish(self) -> String {
        self.output
    }

    pub fn routine(&mut self, routine: &Routine) {
        self.line(&format!("fn {}({}) {{", routine.name, routine.params.join(", ")));
        self.block(&routine.body);
        self.line("}");
    }

    fn block(&mut self, nodes: &[EmissionNode]) {
        self.indent();
        for node in nodes {
            self.statement(node);
        }
        self.dedent();
    }

    pub fn statement(&mut self, node: &EmissionNode) {
        match node {
            EmissionNode::Assign { target, value } => {
                self.line(&format!("{} = {};", expression(target), expression(value)));
            }
            EmissionNode::If { branches, otherwise } => {
                for (i, branch) in branches.iter().enumerate() {
                    let keyword = if i == 0 { "if" } else { "} else if" };
                    self.line(&format!("{keyword} {} {{", expression(&branch.condition)));
                    self.block(&branch.body);
                }
                if let Some(body) = otherwise {
                    if branches.is_empty() {
                        self.line("{");
                    } else {
                        self.line("} else {");
                    }
                    self.block(body);
                }
                self.line("}");
            }
            EmissionNode::Foreach {
                iterable,
                key,
                value,
                body,
            } => {
                let bindings = match key {
                    Some(key) => format!("{key}, {value}"),
                    None => value.clone(),
                };
                self.line(&format!("for {bindings} in {} {{", expression(iterable)));
                self.block(body);
                self.line("}");
            }
            EmissionNode::Sequence(nodes) => {
                for node in nodes {
                    self.statement(node);
                }
            }
            EmissionNode::Return(None) => self.line("return;"),
            EmissionNode::Return(Some(value)) => {
                self.line(&format!("return {};", expression(value)));
            }
            EmissionNode::Throw { failure, subject } => {
                let raised = match failure {
                    Failure::UnexpectedValue { expected } => {
                        format!("unexpected_value({expected:?}, {})", expression(subject))
                    }
                    Failure::MaxDepthExceeded { class, depth } => {
                        format!("max_depth_exceeded({class:?}, {depth}, {})", expression(subject))
                    }
                };
                self.line(&format!("throw {raised};"));
            }
            EmissionNode::Try { site, key, body } => {
                match key {
                    Some(key) => self.line(&format!("collect {site:?} at {key} {{")),
                    None => self.line(&format!("collect {site:?} {{")),
                }
                self.block(body);
                self.line("}");
            }
            other => self.line(&format!("{};", expression(other))),
        }
    }
}

/// Render an expression on one line
pub fn expression(node: &EmissionNode) -> String {
    match node {
        EmissionNode::Literal(literal) => render_literal(literal),
        EmissionNode::Variable(name) => name.clone(),
        EmissionNode::PropertyAccess { target, property } => {
            format!("{}.{property}", expression(target))
        }
        EmissionNode::IndexAccess { target, index } => match index {
            Some(index) => format!("{}[{}]", expression(target), expression(index)),
            None => format!("{}[]", expression(target)),
        },
        EmissionNode::Call { callee, args } => {
            let name = match callee {
                Callee::Builtin(builtin) => builtin.name().to_string(),
                Callee::Routine(name) => name.clone(),
                Callee::Formatter(name) => format!("@{name}"),
            };
            let args: Vec<String> = args.iter().map(expression).collect();
            format!("{name}({})", args.join(", "))
        }
        EmissionNode::Assign { target, value } => {
            format!("{} = {}", expression(target), expression(value))
        }
        // Statements in expression position render as a marker.
        other => format!("<{}>", statement_name(other)),
    }
}

fn statement_name(node: &EmissionNode) -> &'static str {
    match node {
        EmissionNode::If { .. } => "if",
        EmissionNode::Foreach { .. } => "for",
        EmissionNode::Sequence(_) => "sequence",
        EmissionNode::Return(_) => "return",
        EmissionNode::Throw { .. } => "throw",
        EmissionNode::Try { .. } => "collect",
        _ => "expression",
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Int(i) => i.to_string(),
        Literal::Float(f) => format!("{f:?}"),
        Literal::String(s) => format!("{s:?}"),
        Literal::List(items) => {
            let items: Vec<String> = items.iter().map(render_literal).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

/// Render a whole program: a header comment, the entry routine, then the
/// ghost target routines.
pub fn render(program: &Program) -> String {
    let mut compiler = Compiler::new();
    compiler.line(&format!(
        "// stencil template: {} {} ({}, {})",
        program.direction, program.ty, program.flavor, program.strategy
    ));
    compiler.line(&format!("// output operations: {}", program.write_count()));
    compiler.line("");
    compiler.routine(&program.entry);
    for routine in &program.routines {
        compiler.line("");
        compiler.routine(routine);
    }
    compiler.finish()
}
