mod helpers;

use anyhow::Result;
use rsprovision::RsprovisionError;
use rsprovision::config::load_profile;
use rsprovision::packages::PackageSpec;
use rsprovision::platform::PlatformCategory;
use tempfile::tempdir;

use crate::helpers::{utf8, write_profile};

#[test]
fn test_load_profile_basic() -> Result<()> {
    let temp = tempdir()?;
    // editorconfig-checker-disable
    let path = write_profile(
        temp.path(),
        r#"---
hosts:
  - name: agent
    hostname: agent.example.test
    platform: centos-7-x86_64
"#,
    );
    // editorconfig-checker-enable

    let profile = load_profile(&path)?;
    profile.validate()?;

    assert_eq!(profile.hosts.len(), 1);
    assert_eq!(profile.hosts[0].platform, "centos-7-x86_64");
    assert_eq!(profile.ssh.user, "root");
    assert_eq!(profile.ssh.port, 22);
    assert_eq!(profile.repo_configs_dir, utf8(temp.path()).join("repo-configs"));
    assert_eq!(profile.build.builds_url, "http://builds.puppetlabs.lan");
    assert_eq!(profile.build.project, "puppet");
    assert!(profile.packages.is_empty());
    assert!(!profile.check_if_exists);

    Ok(())
}

#[test]
fn test_load_profile_full() -> Result<()> {
    let temp = tempdir()?;
    // editorconfig-checker-disable
    let path = write_profile(
        temp.path(),
        r#"---
repo_configs_dir: /var/cache/configs
check_if_exists: true
ssh:
  user: admin
  port: 2222
  identity_file: keys/id_ed25519
build:
  builds_url: http://builds.example.test
  yum_release_url: http://yum.example.test
  apt_release_url: http://apt.example.test
  project: facter
hosts:
  - name: master
    hostname: 10.0.0.1
    platform: el-7-x86_64
  - name: agent
    hostname: 10.0.0.2
    platform: ubuntu-1404-amd64
packages:
  redhat:
    - curl
    - [git, git-core]
  debian:
    - curl
"#,
    );
    // editorconfig-checker-enable

    let profile = load_profile(&path)?;
    profile.validate()?;

    assert_eq!(profile.repo_configs_dir, "/var/cache/configs");
    assert!(profile.install_options().check_if_exists);
    assert_eq!(profile.ssh.user, "admin");
    assert_eq!(profile.ssh.port, 2222);
    assert_eq!(
        profile.ssh.identity_file.as_deref(),
        Some(utf8(temp.path()).join("keys/id_ed25519").as_path())
    );
    assert_eq!(profile.build.project, "facter");
    assert_eq!(profile.hosts[1].name, "agent");

    let entries = profile.packages.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, PlatformCategory::RedHat);
    assert_eq!(
        entries[0].1,
        vec![PackageSpec::from("curl"), PackageSpec::from(("git", "git-core"))]
    );
    assert_eq!(entries[1].0, PlatformCategory::Debian);

    Ok(())
}

#[test]
fn test_unknown_package_category_is_rejected_at_load() -> Result<()> {
    let temp = tempdir()?;
    // editorconfig-checker-disable
    let path = write_profile(
        temp.path(),
        r#"---
hosts:
  - {name: a, hostname: a.test, platform: el-7-x86_64}
packages:
  gentoo:
    - curl
"#,
    );
    // editorconfig-checker-enable

    let err = load_profile(&path).unwrap_err();
    assert!(matches!(err, RsprovisionError::Config(_)));
    assert!(
        err.to_string().contains("Unknown platform 'gentoo'"),
        "unexpected error: {}",
        err
    );

    Ok(())
}

#[test]
fn test_unknown_field_is_rejected() -> Result<()> {
    let temp = tempdir()?;
    let path = write_profile(
        temp.path(),
        "hosts:\n  - {name: a, hostname: a.test, platform: el-7-x86_64, role: master}\n",
    );

    let err = load_profile(&path).unwrap_err();
    assert!(err.to_string().contains("role"), "unexpected error: {}", err);

    Ok(())
}

#[test]
fn test_missing_profile_is_io_error() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = utf8(temp.path()).join("missing.yaml");

    let err = load_profile(&path).unwrap_err();
    assert!(matches!(err, RsprovisionError::Io { .. }), "unexpected error: {:?}", err);
    assert!(err.to_string().contains("missing.yaml"));
}

#[test]
fn test_empty_package_name_fails_validation() -> Result<()> {
    let temp = tempdir()?;
    let path = write_profile(
        temp.path(),
        "hosts:\n  - {name: a, hostname: a.test, platform: el-7-x86_64}\npackages:\n  redhat:\n    - ''\n",
    );

    let profile = load_profile(&path)?;
    let err = profile.validate().unwrap_err();
    assert!(err.to_string().contains("package names under redhat"));

    Ok(())
}

#[test]
fn test_zero_port_fails_validation() -> Result<()> {
    let temp = tempdir()?;
    let path = write_profile(
        temp.path(),
        "ssh:\n  port: 0\nhosts:\n  - {name: a, hostname: a.test, platform: el-7-x86_64}\n",
    );

    let err = load_profile(&path)?.validate().unwrap_err();
    assert!(matches!(err, RsprovisionError::Validation(_)));

    Ok(())
}
