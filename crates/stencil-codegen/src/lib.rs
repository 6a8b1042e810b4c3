//! stencil-codegen - Template generation
//!
//! This crate turns a [`Type`] into an executable [`Program`]:
//! - [`ModelBuilder`] resolves the type into a [`DataModelNode`] graph,
//!   cutting recursion with ghost nodes
//! - [`Lowering`] translates the graph into the emission AST in [`ast`]
//! - [`optimize_program`] merges adjacent literal writes
//! - [`render`] prints a program as readable source text

pub mod ast;
mod builder;
mod lower;
mod model;
mod optimizer;
mod render;

pub use ast::{Branch, Builtin, Callee, EmissionNode, Failure, Literal, Program, Routine};
pub use builder::{BuildContext, ModelBuilder};
pub use lower::{CONFIG_VAR, Lowering};
pub use model::{
    Accessor, CollectionKind, DataModelNode, DepthGuard, OverflowNode, PropertyNode, ScalarShape,
};
pub use optimizer::{optimize, optimize_program, optimize_routine};
pub use render::{Compiler, expression, render};

use stencil_core::{Config, Direction, Flavor, MetadataLoader, StencilResult, Strategy, Type};

/// Build, lower and optimize the template for one type.
///
/// `strategy` only matters for decoding; encode programs are always eager.
pub fn compile(
    ty: &Type,
    direction: Direction,
    flavor: Flavor,
    strategy: Strategy,
    loader: &dyn MetadataLoader,
    config: &Config,
) -> StencilResult<Program> {
    let root = ModelBuilder::new(loader, config, direction).build(ty)?;
    tracing::debug!(
        ty = %ty,
        direction = %direction,
        ghosts = root.ghost_count(),
        "built data model"
    );
    let program = Lowering::new(&root, direction, strategy, config).lower(&root, flavor)?;
    Ok(optimize_program(program))
}
