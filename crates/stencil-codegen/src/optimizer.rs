//! Output-merging rewrite over emission trees
//!
//! Runs of two or more consecutive `write("literal")` calls within one
//! statement list collapse into a single write of their concatenation.
//! Anything else between two writes is a barrier. Nested sequences are
//! spliced into the enclosing list first so that writes produced by
//! different lowering steps become adjacent. The pass runs bottom-up and
//! repeats until nothing changes.

use crate::ast::{Branch, EmissionNode, Program, Routine};

/// Optimize one statement list to a fixed point
pub fn optimize(nodes: Vec<EmissionNode>) -> Vec<EmissionNode> {
    let mut current = nodes;
    loop {
        let mut merged = 0;
        current = rewrite_list(current, &mut merged);
        if merged == 0 {
            return current;
        }
        tracing::trace!(merged, "merged literal writes");
    }
}

pub fn optimize_routine(routine: Routine) -> Routine {
    Routine {
        body: optimize(routine.body),
        ..routine
    }
}

/// Optimize every routine of a program
pub fn optimize_program(program: Program) -> Program {
    let before = program.write_count();
    let optimized = Program {
        entry: optimize_routine(program.entry),
        routines: program.routines.into_iter().map(optimize_routine).collect(),
        ..program
    };
    tracing::debug!(
        ty = %optimized.ty,
        before,
        after = optimized.write_count(),
        "optimized output operations"
    );
    optimized
}

fn rewrite_list(nodes: Vec<EmissionNode>, merged: &mut usize) -> Vec<EmissionNode> {
    let mut out: Vec<EmissionNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match rewrite_node(node, merged) {
            EmissionNode::Sequence(inner) => {
                *merged += 1;
                for child in inner {
                    push_merged(&mut out, child, merged);
                }
            }
            other => push_merged(&mut out, other, merged),
        }
    }
    out
}

fn push_merged(out: &mut Vec<EmissionNode>, node: EmissionNode, merged: &mut usize) {
    let previous = out.last().and_then(EmissionNode::literal_write);
    if let (Some(previous), Some(text)) = (previous, node.literal_write()) {
        let joined = format!("{previous}{text}");
        out.pop();
        out.push(EmissionNode::write(joined));
        *merged += 1;
        return;
    }
    out.push(node);
}

fn rewrite_node(node: EmissionNode, merged: &mut usize) -> EmissionNode {
    match node {
        EmissionNode::If { branches, otherwise } => EmissionNode::If {
            branches: branches
                .into_iter()
                .map(|branch| Branch {
                    condition: branch.condition,
                    body: rewrite_list(branch.body, merged),
                })
                .collect(),
            otherwise: otherwise.map(|body| rewrite_list(body, merged)),
        },
        EmissionNode::Foreach {
            iterable,
            key,
            value,
            body,
        } => EmissionNode::Foreach {
            iterable,
            key,
            value,
            body: rewrite_list(body, merged),
        },
        EmissionNode::Try { site, key, body } => EmissionNode::Try {
            site,
            key,
            body: rewrite_list(body, merged),
        },
        EmissionNode::Sequence(inner) => EmissionNode::Sequence(rewrite_list(inner, merged)),
        other => other,
    }
}

#[cfg(test)]
#[path = "optimizer/optimizer_tests.rs"]
mod optimizer_tests;
