use sb_api::{
    BundleError, DetachedSurface, EncodeMode, Forest, InsertSource, MemoryDisplay,
    MoveDirection, ParentKey, RemoveMode, ScriptKey,
};

use crate::{
    json_string, open_session, round_trip_mismatch, save_session, CliSession, InsertArgs,
    MoveArgs, Project, RemoveArgs, RenameArgs,
};

/// Output lines of a successful command, `RESULT:OK` first.
pub(crate) type Report = Vec<String>;

fn report() -> Report {
    vec!["RESULT:OK".to_string()]
}

pub(crate) fn run_tree(project: &Project) -> Result<Report, BundleError> {
    let session = open_session(project)?;
    let forest = session.forest();
    let mut lines = report();
    lines.push(format!("ENGINE:{}", session.engine().as_str()));
    lines.push(format!("SCRIPTS:{}", forest.len()));
    for (depth, key) in forest.walk() {
        let entry = forest.lookup(key)?;
        lines.push(format!("NODE:{}|{}|{}", depth, key.0, json_string(&entry.name)));
    }
    Ok(lines)
}

pub(crate) fn run_show(project: &Project, key: i32) -> Result<Report, BundleError> {
    let session = open_session(project)?;
    let entry = session.forest().lookup(ScriptKey(key))?;
    let mut lines = report();
    lines.push(format!("NAME_JSON:{}", json_string(&entry.name)));
    lines.push(format!("COMPRESSED:{}", entry.stored_compressed));
    lines.push(format!("TEXT_JSON:{}", json_string(&entry.text)));
    Ok(lines)
}

/// Decodes, validates, re-encodes and decodes again, comparing the two forests.
pub(crate) fn run_check(project: &Project) -> Result<Report, BundleError> {
    let mut session = open_session(project)?;
    session.forest().validate()?;
    let bytes = session.encode(&mut DetachedSurface, EncodeMode::Detached)?;
    let reopened = CliSession::open(&bytes, MemoryDisplay::new(), project.options.clone())?;
    reopened.forest().validate()?;
    if let Some(detail) = first_difference(session.forest(), reopened.forest()) {
        return Err(round_trip_mismatch(detail));
    }
    let mut lines = report();
    lines.push(format!("SCRIPTS:{}", session.forest().len()));
    lines.push("ROUNDTRIP:OK".to_string());
    Ok(lines)
}

fn first_difference(before: &Forest, after: &Forest) -> Option<String> {
    let left = before.walk();
    let right = after.walk();
    if left.len() != right.len() {
        return Some(format!("{} scripts became {}", left.len(), right.len()));
    }
    for ((left_depth, left_key), (right_depth, right_key)) in left.into_iter().zip(right) {
        if left_depth != right_depth || left_key != right_key {
            return Some(format!("outline differs at script {}", left_key));
        }
        match (before.lookup(left_key), after.lookup(right_key)) {
            (Ok(a), Ok(b)) if a.name == b.name && a.text == b.text => {}
            _ => return Some(format!("script {} differs", left_key)),
        }
    }
    None
}

pub(crate) fn run_insert(project: &Project, args: &InsertArgs) -> Result<Report, BundleError> {
    let mut session = open_session(project)?;
    let parent = match args.parent {
        Some(key) => ParentKey::Entry(ScriptKey(key)),
        None => ParentKey::Root,
    };
    let source = InsertSource::named(args.name.as_str(), args.text.clone().unwrap_or_default());
    let key = session.insert(parent, args.index.unwrap_or(usize::MAX), source)?;
    save_session(&mut session, project)?;
    let mut lines = report();
    lines.push(format!("KEY:{}", key.0));
    lines.push(saved_line(project));
    Ok(lines)
}

pub(crate) fn run_remove(project: &Project, args: &RemoveArgs) -> Result<Report, BundleError> {
    let mut session = open_session(project)?;
    let mode = if args.promote {
        RemoveMode::PromoteChildren
    } else {
        RemoveMode::DeleteSubtree
    };
    let removed = session.remove(ScriptKey(args.key), mode)?;
    save_session(&mut session, project)?;
    let mut lines = report();
    for entry in &removed {
        lines.push(format!("REMOVED:{}|{}", entry.key.0, json_string(&entry.name)));
    }
    lines.push(saved_line(project));
    Ok(lines)
}

pub(crate) fn run_move(project: &Project, args: &MoveArgs) -> Result<Report, BundleError> {
    let mut session = open_session(project)?;
    let key = ScriptKey(args.key);
    let direction = MoveDirection::from(args.direction);
    session.move_script(key, direction)?;
    let (parent, index) = session.forest().parent_of(key)?;
    save_session(&mut session, project)?;
    let mut lines = report();
    lines.push(format!("MOVED:{}", direction.as_str()));
    lines.push(format!("PARENT:{}", parent_label(parent)));
    lines.push(format!("INDEX:{}", index));
    lines.push(saved_line(project));
    Ok(lines)
}

pub(crate) fn run_rename(project: &Project, args: &RenameArgs) -> Result<Report, BundleError> {
    let mut session = open_session(project)?;
    let stored = session.rename(ScriptKey(args.key), &args.name)?;
    save_session(&mut session, project)?;
    let mut lines = report();
    lines.push(format!("NAME_JSON:{}", json_string(&stored)));
    lines.push(saved_line(project));
    Ok(lines)
}

fn parent_label(parent: ParentKey) -> String {
    match parent {
        ParentKey::Root => "ROOT".to_string(),
        ParentKey::Entry(key) => key.0.to_string(),
    }
}

fn saved_line(project: &Project) -> String {
    format!("SAVED:{}", project.path.display())
}
