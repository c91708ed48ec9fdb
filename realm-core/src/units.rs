//! Unit resolution: nested `units` declarations → flat [`Unit`] list.
//!
//! Walk order is depth-first pre-order, so a parent is emitted before its
//! children and siblings keep declaration order. Ids are the dot-joined key
//! path (`"2.3"`).
//!
//! A parent with a glob `src` and nested units gets one `!<root>/**/*`
//! exclusion per direct child that declares its own `src`, so the parent's
//! task does not pick up files owned by a child unit. A child `src` with
//! no literal root (`**/*.c`) contributes no exclusion.

use crate::error::RealmError;
use crate::glob::exclusion_for;
use crate::types::{DevConfig, OrderedMap, RawSrc, Src, Unit, UnitNode};

/// Resolve every unit declared in `dev`.
///
/// Fails with [`RealmError::NotValid`] on the first unit that has a `src`
/// but neither its own `task` nor a realm-wide `defaultTask`.
pub fn get_units(dev: &DevConfig) -> Result<Vec<Unit>, RealmError> {
    let mut out = Vec::new();
    walk(&dev.units, "", dev.default_task.as_deref(), &mut out)?;
    Ok(out)
}

fn walk(
    nodes: &OrderedMap<UnitNode>,
    prefix: &str,
    default_task: Option<&str>,
    out: &mut Vec<Unit>,
) -> Result<(), RealmError> {
    for (key, node) in nodes.iter() {
        let id = if prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{prefix}.{key}")
        };

        if let Some(raw) = &node.src {
            let task = node
                .task
                .as_deref()
                .or(default_task)
                .ok_or_else(|| {
                    RealmError::NotValid(format!("unit '{id}' has no 'task' and no 'defaultTask' is set"))
                })?
                .to_owned();

            out.push(Unit {
                id: id.clone(),
                src: resolve_src(raw, node.units.as_ref()),
                dst: node.dst.clone(),
                task,
                description: node.description.clone(),
            });
        }

        if let Some(children) = &node.units {
            walk(children, &id, default_task, out)?;
        }
    }
    Ok(())
}

fn resolve_src(raw: &RawSrc, children: Option<&OrderedMap<UnitNode>>) -> Src {
    let src = Src::from_raw(raw);
    let (Src::Glob(pattern), Some(children)) = (&src, children) else {
        return src;
    };

    let exclusions: Vec<String> = children
        .iter()
        .filter_map(|(_, child)| child.src.as_ref())
        .filter_map(|child_src| match child_src {
            RawSrc::One(s) => exclusion_for(s),
            RawSrc::Many(list) => list.first().and_then(|s| exclusion_for(s)),
        })
        .collect();

    if exclusions.is_empty() {
        return src;
    }

    let mut list = Vec::with_capacity(exclusions.len() + 1);
    list.push(pattern.clone());
    list.extend(exclusions);
    Src::List(list)
}
