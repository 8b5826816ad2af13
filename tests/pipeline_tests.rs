use anyhow::bail;
use dcf_provision::provision::{
    DatabaseInitializer, FilesystemOps, GroupEntry, InitRequest, LocalFilesystem, LocalPackage,
    OpResult, PackageFetcher, PrincipalManager, UserEntry,
};
use dcf_provision::{
    Collaborators, PipelineState, ProvisionError, ProvisionPlan, ProvisioningPipeline, RunContext,
    Step, TopologyDescriptor, resolve,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const PACKAGE: &str = "/var/tmp/og.tar.bz2";

#[derive(Default)]
struct World {
    journal: Vec<String>,
    fail_on: Option<String>,
    existing: HashSet<PathBuf>,
    groups: HashMap<String, u32>,
    users: HashMap<String, UserEntry>,
    files: HashMap<PathBuf, String>,
    init_requests: Vec<InitRequest>,
}

/// Stand-in for every host capability, sharing one recorded world.
#[derive(Clone, Default)]
struct FakeHost(Rc<RefCell<World>>);

impl FakeHost {
    fn failing_on(op: &str) -> Self {
        let host = Self::default();
        host.0.borrow_mut().fail_on = Some(op.to_string());
        host
    }

    fn op(&self, name: String) -> OpResult<()> {
        let mut world = self.0.borrow_mut();
        let fail = world.fail_on.as_deref() == Some(name.as_str());
        world.journal.push(name.clone());
        if fail {
            bail!("injected failure at '{}'", name);
        }
        Ok(())
    }

    fn journal(&self) -> Vec<String> {
        self.0.borrow().journal.clone()
    }

    fn position(&self, op: &str) -> usize {
        self.journal()
            .iter()
            .position(|entry| entry == op)
            .unwrap_or_else(|| panic!("'{}' never ran", op))
    }

    fn file(&self, path: &str) -> String {
        self.0
            .borrow()
            .files
            .get(Path::new(path))
            .cloned()
            .unwrap_or_default()
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            package: Box::new(self.clone()),
            filesystem: Box::new(self.clone()),
            principals: Box::new(self.clone()),
            database: Box::new(self.clone()),
        }
    }
}

impl PackageFetcher for FakeHost {
    fn acquire(&self) -> OpResult<PathBuf> {
        self.op("acquire".to_string())?;
        self.0.borrow_mut().existing.insert(PathBuf::from(PACKAGE));
        Ok(PathBuf::from(PACKAGE))
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}

impl FilesystemOps for FakeHost {
    fn exists(&self, path: &Path) -> bool {
        self.0.borrow().existing.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> OpResult<()> {
        self.op(format!("mkdir {}", path.display()))?;
        self.0.borrow_mut().existing.insert(path.to_path_buf());
        Ok(())
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> OpResult<()> {
        self.op(format!("unpack {} {}", archive.display(), dest.display()))
    }

    fn append(&self, path: &Path, text: &str) -> OpResult<()> {
        self.op(format!("append {}", path.display()))?;
        self.0
            .borrow_mut()
            .files
            .entry(path.to_path_buf())
            .or_default()
            .push_str(text);
        Ok(())
    }

    fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> OpResult<()> {
        self.op(format!("chown {}:{} {}", user, group, path.display()))
    }
}

impl PrincipalManager for FakeHost {
    fn group(&self, name: &str) -> OpResult<Option<GroupEntry>> {
        Ok(self.0.borrow().groups.get(name).map(|gid| GroupEntry {
            name: name.to_string(),
            gid: *gid,
        }))
    }

    fn user(&self, name: &str) -> OpResult<Option<UserEntry>> {
        Ok(self.0.borrow().users.get(name).cloned())
    }

    fn add_group(&self, name: &str) -> OpResult<()> {
        self.op(format!("groupadd {}", name))?;
        self.0.borrow_mut().groups.insert(name.to_string(), 1001);
        Ok(())
    }

    fn add_user(&self, name: &str, group: &str) -> OpResult<()> {
        self.op(format!("useradd {} {}", name, group))?;
        let mut world = self.0.borrow_mut();
        let gid = world.groups[group];
        world.users.insert(
            name.to_string(),
            UserEntry {
                name: name.to_string(),
                uid: 2001,
                gid,
                home: PathBuf::from("/home").join(name),
            },
        );
        Ok(())
    }
}

impl DatabaseInitializer for FakeHost {
    fn initialize(&self, request: &InitRequest) -> OpResult<()> {
        self.op("initdb".to_string())?;
        self.0.borrow_mut().init_requests.push(request.clone());
        Ok(())
    }
}

fn plan_with_base(base_dir: &str) -> ProvisionPlan {
    let descriptor = format!(
        r#"{{"base_dir":"{}","port":26000,"dcf_stream_id":7,
            "hosts":[{{"dcf_node_id":1,"ip":"10.0.0.1","role":"leader"}},
                     {{"dcf_node_id":2,"ip":"10.0.0.2","role":"follower"}}]}}"#,
        base_dir
    );
    let topology = TopologyDescriptor::from_json_str(&descriptor).unwrap();
    let local_addresses: Vec<IpAddr> = vec!["10.0.0.1".parse().unwrap()];
    let local = resolve(&topology, &local_addresses).unwrap();
    ProvisionPlan::build(&topology, local, &RunContext::new("db-1")).unwrap()
}

fn plan() -> ProvisionPlan {
    plan_with_base("/opt/og")
}

/// The operation each step performs first in a fresh world.
fn failing_op(step: Step) -> &'static str {
    match step {
        Step::AcquirePackage => "acquire",
        Step::PrepareLayout => "mkdir /opt/og/pkg",
        Step::ProvisionPrincipal => "groupadd dbgrp",
        Step::UnpackPackage => "unpack /var/tmp/og.tar.bz2 /opt/og/pkg",
        Step::ExportEnvironment => "append /home/omm/.bashrc",
        Step::ClaimOwnership => "chown omm:dbgrp /opt/og",
        Step::InitializeDatabase => "initdb",
        Step::PatchAccessControl => "append /opt/og/data/pg_hba.conf",
        Step::PatchRuntimeConfig => "append /opt/og/data/postgresql.conf",
    }
}

#[test]
fn full_run_executes_every_step_in_order() {
    let host = FakeHost::default();
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());

    pipeline.run().unwrap();

    assert_eq!(pipeline.state(), PipelineState::Completed);
    assert_eq!(pipeline.completed_steps(), &Step::ALL[..]);
    assert_eq!(
        host.journal(),
        vec![
            "acquire",
            "mkdir /opt/og/pkg",
            "mkdir /opt/og/data",
            "groupadd dbgrp",
            "useradd omm dbgrp",
            "unpack /var/tmp/og.tar.bz2 /opt/og/pkg",
            "append /home/omm/.bashrc",
            "chown omm:dbgrp /opt/og",
            "initdb",
            "append /opt/og/data/pg_hba.conf",
            "append /opt/og/data/postgresql.conf",
        ]
    );
}

#[test]
fn layout_precedes_principal_precedes_unpack_precedes_initdb() {
    let host = FakeHost::default();
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());
    pipeline.run().unwrap();

    let layout = host.position("mkdir /opt/og/pkg");
    let principal = host.position("groupadd dbgrp");
    let unpack = host.position("unpack /var/tmp/og.tar.bz2 /opt/og/pkg");
    let initdb = host.position("initdb");
    assert!(layout < principal);
    assert!(principal < unpack);
    assert!(unpack < initdb);
}

#[test]
fn failure_at_any_step_stops_all_later_steps() {
    for (idx, step) in Step::ALL.into_iter().enumerate() {
        let op = failing_op(step);
        let host = FakeHost::failing_on(op);
        let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());

        let err = pipeline.run().unwrap_err();

        assert_eq!(err.step(), Some(step), "failure injected at {}", op);
        assert!(matches!(err, ProvisionError::Provisioning { .. }));
        assert_eq!(pipeline.state(), PipelineState::Aborted(step));
        assert_eq!(pipeline.completed_steps(), &Step::ALL[..idx]);
        assert_eq!(
            host.journal().last().map(String::as_str),
            Some(op),
            "nothing may run after the failing operation"
        );
    }
}

#[test]
fn early_failure_never_reaches_database_init() {
    let host = FakeHost::failing_on("acquire");
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());

    assert!(pipeline.run().is_err());
    assert_eq!(host.journal(), vec!["acquire"]);
    assert!(host.0.borrow().init_requests.is_empty());
}

#[test]
fn existing_base_dir_aborts_before_creating_anything() {
    let host = FakeHost::default();
    host.0.borrow_mut().existing.insert(PathBuf::from("/opt/og"));
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());

    let err = pipeline.run().unwrap_err();

    assert_eq!(err.step(), Some(Step::PrepareLayout));
    assert!(err.to_string().contains("already exists"));
    assert_eq!(host.journal(), vec!["acquire"]);
}

#[test]
fn existing_base_dir_on_disk_is_left_untouched() {
    let base = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let package = downloads.path().join("og.tar.bz2");
    std::fs::write(&package, b"not really an archive").unwrap();

    let host = FakeHost::default();
    let plan = plan_with_base(base.path().to_str().unwrap());
    let mut pipeline = ProvisioningPipeline::new(
        plan,
        Collaborators {
            package: Box::new(LocalPackage::new(&package)),
            filesystem: Box::new(LocalFilesystem),
            principals: Box::new(host.clone()),
            database: Box::new(host.clone()),
        },
    );

    let err = pipeline.run().unwrap_err();

    assert_eq!(err.step(), Some(Step::PrepareLayout));
    assert!(!base.path().join("pkg").exists());
    assert!(!base.path().join("data").exists());
    assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    assert!(host.journal().is_empty());
}

#[test]
fn user_in_wrong_group_is_not_repaired() {
    let host = FakeHost::default();
    {
        let mut world = host.0.borrow_mut();
        world.groups.insert("dbgrp".to_string(), 1001);
        world.users.insert(
            "omm".to_string(),
            UserEntry {
                name: "omm".to_string(),
                uid: 2001,
                gid: 100,
                home: PathBuf::from("/home/omm"),
            },
        );
    }
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());

    let err = pipeline.run().unwrap_err();

    assert_eq!(err.step(), Some(Step::ProvisionPrincipal));
    assert!(err.to_string().contains("does not belong to group"));
    assert!(host.journal().iter().all(|op| !op.starts_with("useradd")));
}

#[test]
fn existing_principal_is_reused() {
    let host = FakeHost::default();
    {
        let mut world = host.0.borrow_mut();
        world.groups.insert("dbgrp".to_string(), 1001);
        world.users.insert(
            "omm".to_string(),
            UserEntry {
                name: "omm".to_string(),
                uid: 2001,
                gid: 1001,
                home: PathBuf::from("/srv/omm"),
            },
        );
    }
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());

    pipeline.run().unwrap();

    let journal = host.journal();
    assert!(!journal.iter().any(|op| op.starts_with("groupadd")));
    assert!(!journal.iter().any(|op| op.starts_with("useradd")));
    assert!(host.file("/srv/omm/.bashrc").contains("export PGDATA=/opt/og/data"));
}

#[test]
fn patched_files_carry_topology_derived_content() {
    let host = FakeHost::default();
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());
    pipeline.run().unwrap();

    let hba = host.file("/opt/og/data/pg_hba.conf");
    assert!(hba.contains("host\tall\tall\t10.0.0.1/32\ttrust\n"));
    assert!(hba.contains("host\tall\tall\t10.0.0.2/32\ttrust\n"));

    let conf = host.file("/opt/og/data/postgresql.conf");
    assert!(conf.starts_with('\n'));
    assert!(conf.contains("port = 26000\n"));
    assert!(conf.contains("dcf_node_id = 1\n"));
    assert!(conf.contains("dcf_data_path = '/opt/og/data/dcf_data'\n"));
    assert!(conf.contains("dcf_log_path = '/opt/og/data/dcf_log'\n"));
    assert!(conf.contains(
        r#"dcf_config = '[{"stream_id":7,"node_id":1,"ip":"10.0.0.1","port":26001,"role":"LEADER"},{"stream_id":7,"node_id":2,"ip":"10.0.0.2","port":26001,"role":"FOLLOWER"}]'"#
    ));
    assert!(conf.contains(
        "replconninfo1 = 'localhost=10.0.0.1 localport=26002 localheartbeatport=26003 localservice=26004 \
         remotehost=10.0.0.2 remoteport=26002 remoteheartbeatport=26003 remoteservice=26004'\n"
    ));
    assert!(!conf.contains("replconninfo2"));
}

#[test]
fn database_init_runs_as_principal_in_consensus_mode() {
    let host = FakeHost::default();
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());
    pipeline.run().unwrap();

    let requests = host.0.borrow().init_requests.clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.user, "omm");
    assert_eq!(request.node_name, "db-1");
    assert_eq!(request.data_dir, PathBuf::from("/opt/og/data"));
    assert_eq!(request.binary, PathBuf::from("/opt/og/pkg/bin/gs_initdb"));
    assert!(request.consensus);
}

#[test]
fn pipeline_runs_only_once() {
    let host = FakeHost::default();
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());
    pipeline.run().unwrap();
    let ops = host.journal().len();

    let err = pipeline.run().unwrap_err();
    assert_eq!(err.step(), Some(Step::PatchRuntimeConfig));
    assert!(err.to_string().contains("already completed"));
    assert_eq!(host.journal().len(), ops);
    assert_eq!(pipeline.state(), PipelineState::Completed);
}

#[test]
fn rerun_after_abort_reports_the_aborted_step() {
    let host = FakeHost::failing_on("unpack /var/tmp/og.tar.bz2 /opt/og/pkg");
    let mut pipeline = ProvisioningPipeline::new(plan(), host.collaborators());
    pipeline.run().unwrap_err();
    let ops = host.journal().len();

    let err = pipeline.run().unwrap_err();
    assert_eq!(err.step(), Some(Step::UnpackPackage));
    assert_ne!(err.step(), Some(Step::AcquirePackage));
    assert_eq!(host.journal().len(), ops);
    assert_eq!(pipeline.state(), PipelineState::Aborted(Step::UnpackPackage));
}

#[test]
fn second_install_appends_environment_exports_again() {
    let host = FakeHost::default();
    ProvisioningPipeline::new(plan(), host.collaborators())
        .run()
        .unwrap();

    // Operator removed the install dir but kept the principal and its profile.
    host.0
        .borrow_mut()
        .existing
        .retain(|path| !path.starts_with("/opt/og"));
    ProvisioningPipeline::new(plan(), host.collaborators())
        .run()
        .unwrap();

    let profile = host.file("/home/omm/.bashrc");
    assert_eq!(profile.matches("export GAUSSHOME=/opt/og/pkg\n").count(), 2);
    assert_eq!(profile.matches("# added by dcf-provision\n").count(), 2);
}
