mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use realm_core::{RealmError, Src, Tag};
use realm_runtime::core_tasks::{LIFECYCLE_TASKS, SLOT_TASKS};
use realm_runtime::{
    task_fn, ConnectOptions, LoadPolicy, Realm, RuntimeError, SuperRealm, TaskDescriptor,
    TaskOrigin,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use common::{context, realm_error, touch, write_realm};

fn core_names() -> BTreeSet<String> {
    LIFECYCLE_TASKS
        .iter()
        .chain(SLOT_TASKS.iter())
        .map(|s| s.to_string())
        .collect()
}

fn names(realm: &Realm, tag: Option<Tag>) -> BTreeSet<String> {
    realm.task_names(tag).into_iter().collect()
}

fn returning(value: &'static str) -> Arc<dyn realm_runtime::Task> {
    task_fn(move |_, _| Ok(Value::String(value.to_string())))
}

fn resolved_super(realm: &Realm) -> Arc<Realm> {
    match realm.super_realm() {
        SuperRealm::Resolved(sup) => Arc::clone(sup),
        other => panic!("expected resolved super realm, got {other:?}"),
    }
}

#[tokio::test]
async fn root_realm_exposes_exactly_the_core_tasks() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    ctx.connect_root().await.expect("connect root");

    let root = ctx.root();
    assert_eq!(names(&root, None), core_names());
    assert_eq!(names(&root, Some(Tag::Pub)), core_names());
    assert!(names(&root, Some(Tag::Dev)).is_empty());
    assert!(root.units().expect("units").is_empty());
}

#[tokio::test]
async fn connect_is_idempotent() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let dir = write_realm(
        &home.path().join("app"),
        "app",
        Some(json!({ "tasks": { "lint": ["dev"], "docs": ["pub"] } })),
        None,
    );

    let realm = ctx.open(&dir).expect("open");
    realm.connect(ConnectOptions::default()).await.expect("first connect");
    let first = realm.task_names(None);
    for _ in 0..3 {
        realm.connect(ConnectOptions::default()).await.expect("reconnect");
        assert_eq!(realm.task_names(None), first);
    }
    assert_eq!(first.len(), core_names().len() + 2);
}

#[tokio::test]
async fn concurrent_connects_share_one_attempt() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let dir = write_realm(&home.path().join("app"), "app", None, None);
    let realm = ctx.open(&dir).expect("open");

    let (a, b) = tokio::join!(
        realm.connect(ConnectOptions::default()),
        realm.connect(ConnectOptions::default())
    );
    a.expect("first caller");
    b.expect("second caller");
    assert!(realm.is_connected());
    assert!(ctx.root().is_connected());
    assert_eq!(names(&realm, None), core_names());
}

#[tokio::test]
async fn pub_tasks_are_inherited_and_local_definitions_win() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let sup_dir = write_realm(
        &home.path().join("sup"),
        "sup",
        Some(json!({ "tasks": { "shared": ["pub"], "onlySuper": ["pub"], "hidden": ["dev"] } })),
        None,
    );
    let sub_dir = write_realm(
        &sup_dir.join("opt").join("sub"),
        "sub",
        Some(json!({ "tasks": { "shared": ["dev"] } })),
        None,
    );

    let sub = ctx.open(&sub_dir).expect("open sub");
    let sup = resolved_super(&sub);
    assert_eq!(sup.cwd(), sup_dir);

    for name in ["shared", "onlySuper", "hidden"] {
        sup.add_task(TaskDescriptor::new(name), returning("super"), LoadPolicy::Throw)
            .expect("bind super task");
    }
    sub.add_task(TaskDescriptor::new("shared"), returning("sub"), LoadPolicy::Throw)
        .expect("bind sub task");

    sub.connect(ConnectOptions::default()).await.expect("connect sub");
    assert!(sup.is_connected());

    let all = names(&sub, None);
    assert!(all.contains("shared"));
    assert!(all.contains("onlySuper"));
    assert!(!all.contains("hidden"));
    assert!(core_names().is_subset(&all));
    assert!(names(&sub, Some(Tag::Pub)).is_subset(&all));
    assert_eq!(all.iter().filter(|n| *n == "shared").count(), 1);

    assert_eq!(sub.run_and_wait("shared", Value::Null).await.unwrap(), json!("sub"));
    assert_eq!(sub.run_and_wait("onlySuper", Value::Null).await.unwrap(), json!("super"));

    let inherited = sub
        .task_entries()
        .into_iter()
        .find(|e| e.name() == "onlySuper")
        .expect("inherited entry");
    assert_eq!(inherited.origin, TaskOrigin::Inherited { from: sup_dir.clone() });
}

#[tokio::test]
async fn pub_tasks_are_inherited_through_the_whole_chain() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let a_dir = write_realm(
        &home.path().join("a"),
        "a",
        Some(json!({ "tasks": { "fromA": ["pub"], "aOnly": ["dev"] } })),
        None,
    );
    let b_dir = write_realm(
        &a_dir.join("opt").join("b"),
        "b",
        Some(json!({ "tasks": { "fromB": ["pub"] } })),
        None,
    );
    let c_dir = write_realm(&b_dir.join("opt").join("c"), "c", None, None);

    let c = ctx.open(&c_dir).expect("open c");
    let b = resolved_super(&c);
    let a = resolved_super(&b);
    assert_eq!(b.cwd(), b_dir);
    assert_eq!(a.cwd(), a_dir);
    assert!(resolved_super(&a).is_root());

    ctx.root()
        .add_task(
            TaskDescriptor::new("fromRoot").with_tags([Tag::Pub]),
            returning("root"),
            LoadPolicy::Throw,
        )
        .expect("add root task");
    a.add_task(TaskDescriptor::new("fromA"), returning("a"), LoadPolicy::Throw)
        .expect("bind a task");
    a.add_task(TaskDescriptor::new("aOnly"), returning("a-dev"), LoadPolicy::Throw)
        .expect("bind a dev task");
    b.add_task(TaskDescriptor::new("fromB"), returning("b"), LoadPolicy::Throw)
        .expect("bind b task");

    c.connect(ConnectOptions::default()).await.expect("connect c");
    assert!(ctx.root().is_connected() && a.is_connected() && b.is_connected());

    let all = names(&c, None);
    for name in ["fromRoot", "fromA", "fromB"] {
        assert!(all.contains(name), "{name} missing from {all:?}");
    }
    assert!(!all.contains("aOnly"));
    assert!(!names(&b, None).contains("aOnly"));

    assert_eq!(c.run_and_wait("fromRoot", Value::Null).await.unwrap(), json!("root"));
    assert_eq!(c.run_and_wait("fromA", Value::Null).await.unwrap(), json!("a"));
    assert_eq!(c.run_and_wait("fromB", Value::Null).await.unwrap(), json!("b"));

    let origin_of = |name: &str| {
        c.task_entries()
            .into_iter()
            .find(|e| e.name() == name)
            .map(|e| e.origin)
            .expect("entry")
    };
    assert_eq!(
        origin_of("fromRoot"),
        TaskOrigin::Inherited { from: ctx.root().cwd().to_path_buf() }
    );
    assert_eq!(origin_of("fromA"), TaskOrigin::Inherited { from: a_dir.clone() });
    assert_eq!(origin_of("fromB"), TaskOrigin::Inherited { from: b_dir.clone() });
}

#[tokio::test]
async fn dev_task_names_exclude_core_tasks() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let dir = write_realm(
        &home.path().join("app"),
        "app",
        Some(json!({ "tasks": { "lint": ["dev"], "fmt": { "tags": ["dev"], "description": "Format" } } })),
        None,
    );
    let realm = ctx
        .open_connected(&dir, ConnectOptions::default())
        .await
        .expect("connect");

    assert_eq!(
        names(&realm, Some(Tag::Dev)),
        BTreeSet::from(["fmt".to_string(), "lint".to_string()])
    );
    assert_eq!(realm.task("fmt").unwrap().description.as_deref(), Some("Format"));
}

#[tokio::test]
async fn unresolvable_explicit_super_fails_connect() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let missing = home.path().join("does-not-exist");
    let dir = write_realm(
        &home.path().join("app"),
        "app",
        Some(json!({ "superRealm": missing })),
        None,
    );

    let realm = ctx.open(&dir).expect("open still succeeds");
    assert!(matches!(realm.super_realm(), SuperRealm::Unresolved { .. }));

    let err = realm.connect(ConnectOptions::default()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::SuperRealmUnavailable { ref path, .. } if *path == missing));
    assert!(!realm.is_connected());
}

#[tokio::test]
async fn explicit_super_realm_is_followed() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let sup_dir = write_realm(
        &home.path().join("sup"),
        "sup",
        Some(json!({ "tasks": { "deploy": ["pub"] } })),
        None,
    );
    let dir = write_realm(
        &home.path().join("elsewhere/app"),
        "app",
        Some(json!({ "superRealm": sup_dir })),
        None,
    );

    let realm = ctx
        .open_connected(&dir, ConnectOptions::default())
        .await
        .expect("connect");
    assert_eq!(realm.info().super_realm.as_deref(), Some(sup_dir.as_path()));
    assert!(realm.has_task("deploy"));
}

#[tokio::test]
async fn unknown_and_unbound_tasks_fail() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let dir = write_realm(
        &home.path().join("app"),
        "app",
        Some(json!({ "tasks": { "lint": ["dev"] } })),
        None,
    );
    let realm = ctx
        .open_connected(&dir, ConnectOptions::default())
        .await
        .expect("connect");

    let err = realm.run_and_wait("nope", Value::Null).await.unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownTask(ref n) if n == "nope"));

    let err = realm.run_and_wait("lint", Value::Null).await.unwrap_err();
    assert!(matches!(err, RuntimeError::TaskNotBound(ref n) if n == "lint"));

    let err = realm.run_and_wait("build", Value::Null).await.unwrap_err();
    assert!(matches!(err, RuntimeError::TaskNotBound(ref n) if n == "build"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tasks_added_while_connecting_are_kept() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let dir = write_realm(&home.path().join("app"), "app", None, None);
    let realm = ctx.open(&dir).expect("open");

    let adder = {
        let realm = Arc::clone(&realm);
        tokio::spawn(async move {
            for i in 0..200 {
                realm
                    .add_task(TaskDescriptor::new(format!("t{i}")), returning("ok"), LoadPolicy::Throw)
                    .expect("add task");
                tokio::task::yield_now().await;
            }
        })
    };
    let connector = {
        let realm = Arc::clone(&realm);
        tokio::spawn(async move { realm.connect(ConnectOptions::default()).await })
    };
    connector.await.expect("join connect").expect("connect");
    adder.await.expect("join adder");

    for i in 0..200 {
        assert!(realm.has_task(&format!("t{i}")), "t{i} lost");
    }
}

#[tokio::test]
async fn add_and_delete_after_connect() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let dir = write_realm(&home.path().join("app"), "app", None, None);
    let realm = ctx
        .open_connected(&dir, ConnectOptions::default())
        .await
        .expect("connect");

    assert!(realm
        .add_task(
            TaskDescriptor::new("greet").with_tags([Tag::Pub]),
            returning("hi"),
            LoadPolicy::Throw
        )
        .unwrap());
    assert!(realm.has_task("greet"));
    assert_eq!(realm.run_and_wait("greet", json!({})).await.unwrap(), json!("hi"));

    let err = realm
        .add_task(TaskDescriptor::new("greet"), returning("again"), LoadPolicy::Throw)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::TaskExists(_)));
    assert!(!realm
        .add_task(TaskDescriptor::new("greet"), returning("again"), LoadPolicy::Ignore)
        .unwrap());

    assert!(realm.delete_task("greet"));
    assert!(!realm.has_task("greet"));
    assert!(!realm.delete_task("greet"));
}

#[tokio::test]
async fn realm_exposes_units_and_artifacts() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let dir = write_realm(
        &home.path().join("app"),
        "app",
        Some(json!({ "artifacts": { "custom": ["somefile"] } })),
        Some(json!({
            "units": {
                "1": { "src": "src/**/*", "dst": "lib", "task": "task1" },
                "2": { "units": { "3": { "src": "src/2/**/*.js", "dst": "dst/2", "task": "task2" } } }
            }
        })),
    );
    touch(&dir.join("somefile"), "");
    touch(&dir.join("src/index.js"), "");

    let realm = ctx.open(&dir).expect("open");
    let units = realm.units().expect("units");
    let ids: Vec<&str> = units.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, ["1", "2.3"]);
    assert_eq!(units[1].src, Src::Glob("src/2/**/*.js".into()));

    let common: Vec<String> = realm
        .artifacts()
        .get("common")
        .expect("common")
        .into_iter()
        .map(|e| e.path.to_string_lossy().into_owned())
        .collect();
    assert_eq!(common, [".realm", "package.json", "src"]);
}

#[tokio::test]
async fn invalid_units_fail_lazily() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let dir = write_realm(
        &home.path().join("app"),
        "app",
        None,
        Some(json!({ "units": { "1": { "src": "src/**/*", "dst": "lib" } } })),
    );

    let realm = ctx
        .open_connected(&dir, ConnectOptions::default())
        .await
        .expect("open and connect despite invalid units");
    let err = RuntimeError::from(realm.units().unwrap_err());
    assert!(matches!(realm_error(&err), RealmError::NotValid(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn command_tasks_run_in_the_realm_directory() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    let dir = write_realm(
        &home.path().join("app"),
        "app",
        Some(json!({
            "tasks": {
                "marker": { "tags": ["pub"], "command": "cat marker.txt" },
                "params": { "tags": ["dev"], "command": "printf '%s' \"$REALM_TASK_PARAMS\"" },
                "broken": { "tags": ["dev"], "command": "echo boom >&2; exit 3" }
            }
        })),
        None,
    );
    touch(&dir.join("marker.txt"), "from-app\n");

    let realm = ctx
        .open_connected(&dir, ConnectOptions::default())
        .await
        .expect("connect");

    assert_eq!(realm.run_and_wait("marker", Value::Null).await.unwrap(), json!("from-app"));

    let out = realm.run_and_wait("params", json!({ "n": 1 })).await.unwrap();
    let echoed: Value = serde_json::from_str(out.as_str().unwrap()).unwrap();
    assert_eq!(echoed, json!({ "n": 1 }));

    let err = realm.run_and_wait("broken", Value::Null).await.unwrap_err();
    assert!(matches!(err, RuntimeError::TaskFailed { ref message, .. } if message == "boom"));
}

#[tokio::test]
async fn info_task_describes_realms() {
    let home = TempDir::new().expect("home");
    let ctx = context(&home);
    ctx.connect_root().await.expect("connect root");
    let dir = write_realm(&home.path().join("app"), "app", None, None);

    let root = ctx.root();
    let info = root
        .run_and_wait("realmInfo", json!({ "realm": dir }))
        .await
        .expect("realmInfo");
    assert_eq!(info["name"], "app");
    assert_eq!(info["version"], "0.1.0");
    assert_eq!(info["connected"], false);
    assert_eq!(info["superRealm"], json!(root.cwd()));

    let own = root.run_and_wait("realmInfo", Value::Null).await.expect("own info");
    assert_eq!(own["cwd"], json!(root.cwd()));
    assert_eq!(own["connected"], true);
}
