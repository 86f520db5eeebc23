//! Turning a parsed schema into a live dispatcher.
//!
//! Entries are registered in four passes (classes, unions, generics, then
//! methods), each in file order. The first rejected entry stops loading and
//! is reported with the span of its name (or, for methods, its signature).

use std::ops::Range;

use s4_core::{classes, render_signature, ClassDef, DispatchError, Dispatcher};

use crate::error::SchemaError;
use crate::schema::{MethodEntry, Schema};

/// Parse `source` and load it.
pub fn load_str(source: &str) -> Result<Dispatcher<String>, SchemaError> {
    let schema = Schema::from_str(source)?;
    load(&schema)
}

/// Build a dispatcher holding everything `schema` declares.
///
/// Each method's handler returns its label; a method marked `next` appends
/// `" > "` and the result of the next method.
pub fn load(schema: &Schema) -> Result<Dispatcher<String>, SchemaError> {
    let dispatcher = Dispatcher::with_config(schema.dispatch);

    for entry in &schema.classes {
        let mut def = ClassDef::new(entry.name.get_ref().as_str(), entry.contains.iter().map(String::as_str));
        if entry.sealed {
            def = def.sealed();
        }
        dispatcher
            .define_class_with(def)
            .map_err(at(entry.name.span()))?;
    }

    for entry in &schema.unions {
        dispatcher
            .define_union(entry.name.get_ref().as_str(), entry.members.iter().map(String::as_str))
            .map_err(at(entry.name.span()))?;
    }

    for entry in &schema.generics {
        dispatcher
            .define_generic(entry.name.get_ref(), entry.params.iter().cloned())
            .map_err(at(entry.name.span()))?;
    }

    for entry in &schema.methods {
        define_method(&dispatcher, entry).map_err(at(entry.span()))?;
    }

    tracing::debug!(
        classes = schema.classes.len(),
        unions = schema.unions.len(),
        generics = schema.generics.len(),
        methods = schema.methods.len(),
        "loaded schema"
    );
    Ok(dispatcher)
}

fn define_method(dispatcher: &Dispatcher<String>, entry: &MethodEntry) -> Result<(), DispatchError> {
    let signature = classes(entry.signature.get_ref().iter().map(String::as_str));
    let label = entry
        .label
        .clone()
        .unwrap_or_else(|| render_signature(&signature));
    let next = entry.next;

    dispatcher.define_method(&entry.generic, signature, move |ctx, args: &[String]| {
        if next {
            let rest = ctx.call_next(args)?;
            Ok(format!("{} > {}", label, rest))
        } else {
            Ok(label.clone())
        }
    })?;
    Ok(())
}

fn at(span: Range<usize>) -> impl FnOnce(DispatchError) -> SchemaError {
    move |error| SchemaError::Dispatch { error, span }
}
