//! Template interpreter
//!
//! A [`Machine`] executes one [`Program`]. Each call gets a fresh run state:
//! variables live in per-routine frames, output goes to the caller's sink
//! (or to a scratch buffer while inside a collect block) and lazy input is
//! read through one seekable resource handle.

use crate::slot::{Slot, key_value};
use stencil_codegen::{Callee, EmissionNode, Failure, Literal, Program, Routine};
use stencil_core::{Config, Direction, Formatters, StencilError, StencilResult, Type, Value};
use stencil_json::Boundary;
use std::collections::HashMap;
use std::fmt;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};

/// Seekable input handle
pub trait Resource: Read + Seek {}

impl<T: Read + Seek> Resource for T {}

/// One element that failed while collecting errors
#[derive(Debug)]
pub struct ElementError {
    /// Type string of the collection the element belongs to
    pub site: String,
    /// Index or key of the element, when known
    pub key: Option<String>,
    pub error: StencilError,
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{}]: {}", self.site, key, self.error),
            None => write!(f, "{}: {}", self.site, self.error),
        }
    }
}

/// Result of a decode call
#[derive(Debug)]
pub struct Decoded {
    pub value: Value,
    /// Element failures recorded in collect-errors mode; empty otherwise
    pub errors: Vec<ElementError>,
}

/// Executes a generated program
pub struct Machine<'a> {
    program: &'a Program,
    formatters: &'a Formatters,
    config: &'a Config,
    routines: HashMap<&'a str, &'a Routine>,
}

impl<'a> Machine<'a> {
    pub fn new(program: &'a Program, formatters: &'a Formatters, config: &'a Config) -> Self {
        let routines = program
            .routines
            .iter()
            .map(|routine| (routine.name.as_str(), routine))
            .collect();
        Self {
            program,
            formatters,
            config,
            routines,
        }
    }

    pub fn program(&self) -> &Program {
        self.program
    }

    fn expect_direction(&self, direction: Direction) -> StencilResult<()> {
        if self.program.direction != direction {
            return Err(StencilError::Template(format!(
                "{} template for {} cannot {direction}",
                self.program.direction, self.program.ty
            )));
        }
        Ok(())
    }

    /// Encode `value` into `sink`.
    ///
    /// Returns the element errors recorded in collect-errors mode.
    pub fn encode(&self, value: &Value, sink: &mut dyn Write) -> StencilResult<Vec<ElementError>> {
        self.expect_direction(Direction::Encode)?;
        tracing::trace!(ty = %self.program.ty, "running encode template");

        let mut writer = BufWriter::new(sink);
        let errors = {
            let mut run = Run::new(self, Some(&mut writer), None);
            run.call(&self.program.entry, vec![Slot::Value(value.clone())])?;
            run.errors
        };
        writer.flush()?;
        Ok(errors)
    }

    /// Decode the whole resource
    pub fn decode(&self, resource: &mut dyn Resource) -> StencilResult<Decoded> {
        let end = resource.seek(SeekFrom::End(0))?;
        self.decode_range(resource, Boundary::new(0, end))
    }

    /// Decode the value spanned by `boundary`
    pub fn decode_range(
        &self,
        resource: &mut dyn Resource,
        boundary: Boundary,
    ) -> StencilResult<Decoded> {
        self.expect_direction(Direction::Decode)?;
        tracing::trace!(
            ty = %self.program.ty,
            strategy = %self.program.strategy,
            offset = boundary.offset,
            length = boundary.length,
            "running decode template"
        );

        let mut run = Run::new(self, None, Some(resource));
        let value = run
            .call(&self.program.entry, vec![Slot::Boundary(boundary)])?
            .into_value()?;
        Ok(Decoded {
            value,
            errors: run.errors,
        })
    }
}

pub(crate) type Frame = HashMap<String, Slot>;

enum Flow {
    Next,
    Return(Slot),
}

/// State of one encode or decode call
pub(crate) struct Run<'a> {
    pub(crate) machine: &'a Machine<'a>,
    sink: Option<&'a mut (dyn Write + 'a)>,
    resource: Option<&'a mut (dyn Resource + 'a)>,
    /// Scratch output of open collect blocks, innermost last
    buffers: Vec<Vec<u8>>,
    /// Open objects per class
    pub(crate) depths: HashMap<String, usize>,
    /// Parsed type strings of `is_type` checks
    pub(crate) types: HashMap<String, Type>,
    errors: Vec<ElementError>,
}

impl<'a> Run<'a> {
    fn new(
        machine: &'a Machine<'a>,
        sink: Option<&'a mut (dyn Write + 'a)>,
        resource: Option<&'a mut (dyn Resource + 'a)>,
    ) -> Self {
        Self {
            machine,
            sink,
            resource,
            buffers: Vec::new(),
            depths: HashMap::new(),
            types: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn config(&self) -> &'a Config {
        self.machine.config
    }

    pub(crate) fn emit(&mut self, bytes: &[u8]) -> StencilResult<()> {
        if let Some(buffer) = self.buffers.last_mut() {
            buffer.extend_from_slice(bytes);
            return Ok(());
        }
        match self.sink.as_mut() {
            Some(sink) => sink.write_all(bytes)?,
            None => {
                return Err(StencilError::Template(
                    "template writes output but no sink is attached".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn resource(&mut self) -> StencilResult<&mut (dyn Resource + 'a)> {
        self.resource.as_deref_mut().ok_or_else(|| {
            StencilError::Template("template reads input but no resource is attached".to_string())
        })
    }

    fn call(&mut self, routine: &Routine, args: Vec<Slot>) -> StencilResult<Slot> {
        if args.len() != routine.params.len() {
            return Err(StencilError::Template(format!(
                "routine {} takes {} arguments, got {}",
                routine.name,
                routine.params.len(),
                args.len()
            )));
        }
        let mut frame: Frame = routine.params.iter().cloned().zip(args).collect();
        match self.block(&mut frame, &routine.body)? {
            Flow::Return(slot) => Ok(slot),
            Flow::Next => Ok(Slot::Value(Value::Null)),
        }
    }

    fn block(&mut self, frame: &mut Frame, nodes: &[EmissionNode]) -> StencilResult<Flow> {
        for node in nodes {
            if let Flow::Return(slot) = self.statement(frame, node)? {
                return Ok(Flow::Return(slot));
            }
        }
        Ok(Flow::Next)
    }

    fn statement(&mut self, frame: &mut Frame, node: &EmissionNode) -> StencilResult<Flow> {
        match node {
            EmissionNode::Assign { target, value } => {
                let value = self.eval(frame, value)?;
                self.assign(frame, target, value)?;
            }
            EmissionNode::If { branches, otherwise } => {
                for branch in branches {
                    if self.condition(frame, &branch.condition)? {
                        return self.block(frame, &branch.body);
                    }
                }
                if let Some(body) = otherwise {
                    return self.block(frame, body);
                }
            }
            EmissionNode::Foreach {
                iterable,
                key,
                value,
                body,
            } => return self.foreach(frame, iterable, key.as_deref(), value, body),
            EmissionNode::Sequence(nodes) => return self.block(frame, nodes),
            EmissionNode::Return(value) => {
                let slot = match value {
                    Some(value) => self.eval(frame, value)?,
                    None => Slot::Value(Value::Null),
                };
                return Ok(Flow::Return(slot));
            }
            EmissionNode::Throw { failure, subject } => {
                return Err(match failure {
                    Failure::UnexpectedValue { expected } => {
                        let subject = self.eval(frame, subject)?;
                        StencilError::unexpected(expected, self.describe(&subject)?)
                    }
                    Failure::MaxDepthExceeded { class, depth } => StencilError::MaxDepthExceeded {
                        class: class.clone(),
                        depth: *depth,
                    },
                });
            }
            EmissionNode::Try { site, key, body } => {
                return self.collect(frame, site, key.as_deref(), body);
            }
            expression => {
                self.eval(frame, expression)?;
            }
        }
        Ok(Flow::Next)
    }

    fn condition(&mut self, frame: &Frame, node: &EmissionNode) -> StencilResult<bool> {
        match self.eval(frame, node)? {
            Slot::Value(Value::Bool(b)) => Ok(b),
            other => Err(StencilError::Template(format!(
                "condition evaluated to a {}",
                other.kind()
            ))),
        }
    }

    fn foreach(
        &mut self,
        frame: &mut Frame,
        iterable: &EmissionNode,
        key: Option<&str>,
        value: &str,
        body: &[EmissionNode],
    ) -> StencilResult<Flow> {
        let step = |run: &mut Self, frame: &mut Frame, k: Value, v: Slot| {
            if let Some(key) = key {
                frame.insert(key.to_string(), Slot::Value(k));
            }
            frame.insert(value.to_string(), v);
            run.block(frame, body)
        };

        match self.eval(frame, iterable)? {
            Slot::Value(Value::List(items)) => {
                for (index, item) in items.into_iter().enumerate() {
                    let index = Value::Int(i64::try_from(index).unwrap_or(i64::MAX));
                    if let Flow::Return(slot) = step(self, frame, index, Slot::Value(item))? {
                        return Ok(Flow::Return(slot));
                    }
                }
            }
            Slot::Value(Value::Dict(map)) => {
                for (k, item) in map {
                    let flow = step(self, frame, key_value(k), Slot::Value(item))?;
                    if let Flow::Return(slot) = flow {
                        return Ok(Flow::Return(slot));
                    }
                }
            }
            Slot::List(None) | Slot::Dict(None, _) => {}
            Slot::List(Some(mut cursor)) => {
                let mut index = 0i64;
                while let Some(boundary) = cursor.next_item(self.resource()?)? {
                    let flow = step(self, frame, Value::Int(index), Slot::Boundary(boundary))?;
                    if let Flow::Return(slot) = flow {
                        return Ok(Flow::Return(slot));
                    }
                    index += 1;
                }
            }
            Slot::Dict(Some(mut cursor), kind) => {
                while let Some((k, boundary)) = cursor.next_entry(self.resource()?, kind)? {
                    let flow = step(self, frame, key_value(k), Slot::Boundary(boundary))?;
                    if let Flow::Return(slot) = flow {
                        return Ok(Flow::Return(slot));
                    }
                }
            }
            other => return Err(StencilError::unexpected("list or dict", self.describe(&other)?)),
        }
        Ok(Flow::Next)
    }

    /// Run `body`, recording a failure instead of propagating it
    fn collect(
        &mut self,
        frame: &mut Frame,
        site: &str,
        key: Option<&str>,
        body: &[EmissionNode],
    ) -> StencilResult<Flow> {
        self.buffers.push(Vec::new());
        let depths = self.depths.clone();
        let result = self.block(frame, body);
        let buffered = self.buffers.pop().unwrap_or_default();

        match result {
            Ok(flow) => {
                self.emit(&buffered)?;
                Ok(flow)
            }
            Err(error) if recoverable(&error) => {
                self.depths = depths;
                let key = key.and_then(|k| frame.get(k)).map(describe_key);
                tracing::warn!(site, key = ?key, error = %error, "element failed, error collected");
                self.errors.push(ElementError {
                    site: site.to_string(),
                    key,
                    error,
                });
                Ok(Flow::Next)
            }
            Err(error) => Err(error),
        }
    }

    fn assign(
        &mut self,
        frame: &mut Frame,
        target: &EmissionNode,
        value: Slot,
    ) -> StencilResult<()> {
        match target {
            EmissionNode::Variable(name) => {
                frame.insert(name.clone(), value);
                Ok(())
            }
            EmissionNode::PropertyAccess { target, property } => {
                let value = value.into_value()?;
                match variable_mut(frame, target)? {
                    Slot::Value(Value::Object(object)) => {
                        object.set(property.clone(), value);
                        Ok(())
                    }
                    other => Err(StencilError::Template(format!(
                        "cannot set property {property} on a {}",
                        other.kind()
                    ))),
                }
            }
            EmissionNode::IndexAccess { target, index: None } => {
                let value = value.into_value()?;
                match variable_mut(frame, target)? {
                    Slot::Value(Value::List(items)) => {
                        items.push(value);
                        Ok(())
                    }
                    other => Err(StencilError::Template(format!(
                        "cannot append to a {}",
                        other.kind()
                    ))),
                }
            }
            EmissionNode::IndexAccess {
                target,
                index: Some(index),
            } => {
                let key = crate::slot::value_key(self.eval(frame, index)?.as_value()?)?;
                let value = value.into_value()?;
                match variable_mut(frame, target)? {
                    Slot::Value(Value::Dict(map)) => {
                        map.insert(key, value);
                        Ok(())
                    }
                    other => Err(StencilError::Template(format!(
                        "cannot index into a {}",
                        other.kind()
                    ))),
                }
            }
            other => Err(StencilError::Template(format!("cannot assign to {other:?}"))),
        }
    }

    fn eval(&mut self, frame: &Frame, node: &EmissionNode) -> StencilResult<Slot> {
        match node {
            EmissionNode::Literal(literal) => Ok(Slot::Value(literal_value(literal))),
            EmissionNode::Variable(name) => variable(frame, name).cloned(),
            EmissionNode::PropertyAccess { target, property } => match target.as_ref() {
                EmissionNode::Variable(name) => project(variable(frame, name)?, property),
                other => {
                    let target = self.eval(frame, other)?;
                    project(&target, property)
                }
            },
            EmissionNode::IndexAccess {
                target,
                index: Some(index),
            } => {
                let index = self.eval(frame, index)?.into_value()?;
                match target.as_ref() {
                    EmissionNode::Variable(name) => lookup(variable(frame, name)?, &index),
                    other => {
                        let target = self.eval(frame, other)?;
                        lookup(&target, &index)
                    }
                }
            }
            EmissionNode::Call { callee, args } => match callee {
                Callee::Builtin(builtin) => {
                    let args = args
                        .iter()
                        .map(|arg| self.eval(frame, arg))
                        .collect::<StencilResult<Vec<_>>>()?;
                    self.builtin(*builtin, args)
                }
                Callee::Routine(name) => {
                    let machine = self.machine;
                    let routine = machine.routines.get(name.as_str()).copied().ok_or_else(|| {
                        StencilError::Template(format!("unknown routine {name}"))
                    })?;
                    let args = args
                        .iter()
                        .map(|arg| self.eval(frame, arg))
                        .collect::<StencilResult<Vec<_>>>()?;
                    self.call(routine, args)
                }
                Callee::Formatter(name) => {
                    // The trailing configuration argument is bound by the machine.
                    let input = match args.first() {
                        Some(arg) => self.eval(frame, arg)?.into_value()?,
                        None => Value::Null,
                    };
                    let machine = self.machine;
                    machine
                        .formatters
                        .apply(name, input, machine.config)
                        .map(Slot::Value)
                }
            },
            other => Err(StencilError::Template(format!(
                "statement used as an expression: {other:?}"
            ))),
        }
    }

    /// Kind of a value for error messages; boundaries report their wire kind
    fn describe(&mut self, slot: &Slot) -> StencilResult<String> {
        match slot {
            Slot::Value(value) => Ok(value.kind().to_string()),
            other => Ok(self.wire_kind(other)?.to_string()),
        }
    }
}

/// Element failures that collect mode records; I/O and template faults abort
fn recoverable(error: &StencilError) -> bool {
    !matches!(error, StencilError::Resource(_) | StencilError::Template(_))
}

fn describe_key(slot: &Slot) -> String {
    match slot {
        Slot::Value(Value::Int(i)) => i.to_string(),
        Slot::Value(Value::String(s)) => s.clone(),
        other => format!("{other:?}"),
    }
}

fn variable<'f>(frame: &'f Frame, name: &str) -> StencilResult<&'f Slot> {
    frame
        .get(name)
        .ok_or_else(|| StencilError::Template(format!("unbound variable {name}")))
}

fn variable_mut<'f>(frame: &'f mut Frame, target: &EmissionNode) -> StencilResult<&'f mut Slot> {
    match target {
        EmissionNode::Variable(name) => frame
            .get_mut(name)
            .ok_or_else(|| StencilError::Template(format!("unbound variable {name}"))),
        other => Err(StencilError::Template(format!("unsupported assignment target {other:?}"))),
    }
}

/// `target.property`; missing fields read as null
fn project(target: &Slot, property: &str) -> StencilResult<Slot> {
    let value = match target {
        Slot::Value(Value::Object(object)) => object.get(property).cloned(),
        Slot::Value(Value::Dict(map)) => map.get(&stencil_core::Key::from(property)).cloned(),
        Slot::Value(other) => return Err(StencilError::unexpected("object", other.kind())),
        other => {
            return Err(StencilError::Template(format!(
                "cannot read property {property} of a {}",
                other.kind()
            )));
        }
    };
    Ok(Slot::Value(value.unwrap_or_default()))
}

/// `target[index]`; missing entries read as null
fn lookup(target: &Slot, index: &Value) -> StencilResult<Slot> {
    Ok(match (target, index) {
        (Slot::Fields(fields), Value::String(name)) => match fields.get(name) {
            Some(boundary) => Slot::Boundary(*boundary),
            None => Slot::Value(Value::Null),
        },
        (Slot::Value(Value::Dict(map)), index) => {
            let key = crate::slot::value_key(index)?;
            Slot::Value(map.get(&key).cloned().unwrap_or_default())
        }
        (Slot::Value(Value::List(items)), Value::Int(i)) => Slot::Value(
            usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or_default(),
        ),
        (Slot::Value(Value::Null), _) => Slot::Value(Value::Null),
        (Slot::Value(other), _) => return Err(StencilError::unexpected("dict", other.kind())),
        (other, index) => {
            return Err(StencilError::Template(format!(
                "cannot index a {} with a {}",
                other.kind(),
                index.kind()
            )));
        }
    })
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
        Literal::List(items) => Value::List(items.iter().map(literal_value).collect()),
    }
}
