mod common;

use bevy::prelude::*;
use common::{alpha, spawn_player};
use veil_core::{
    build_headless_app, dispatch_command, run_invis_command, AdminFlags, TeamSide, VeilError,
    VisibilityRegistry,
};
use veil_runtime::INVIS_USAGE;

fn test_app() -> App {
    common::ensure_test_config();
    build_headless_app()
}

#[test]
fn empty_side_selector_changes_nothing() {
    let mut app = test_app();
    let t = spawn_player(&mut app.world, 1, "lonely", Some(TeamSide::Terrorist), 1);

    let err = run_invis_command(&mut app.world, None, &["@ct"]).unwrap_err();
    assert!(matches!(err, VeilError::TargetNotFound(_)));
    assert!(app.world.resource::<VisibilityRegistry>().is_empty());
    assert_eq!(alpha(&app.world, t.pawn), 255);
}

#[test]
fn mixed_toggle_reports_both_directions() -> anyhow::Result<()> {
    let mut app = test_app();
    let alice = spawn_player(&mut app.world, 1, "alice", Some(TeamSide::Terrorist), 0);
    let bob = spawn_player(&mut app.world, 2, "bob", Some(TeamSide::CounterTerrorist), 0);

    let first = run_invis_command(&mut app.world, None, &["alice"])?;
    assert_eq!(first.feedback(), "Successfully made 1 player(s) invisible.");

    let second = run_invis_command(&mut app.world, None, &["@all"])?;
    assert_eq!(
        second.feedback(),
        "Successfully made 1 player(s) invisible and made 1 player(s) visible."
    );
    let registry = app.world.resource::<VisibilityRegistry>();
    assert!(!registry.contains(alice.controller));
    assert!(registry.contains(bob.controller));
    Ok(())
}

#[test]
fn ambiguous_name_is_rejected() {
    let mut app = test_app();
    spawn_player(&mut app.world, 1, "sniper_one", Some(TeamSide::Terrorist), 0);
    spawn_player(&mut app.world, 2, "sniper_two", Some(TeamSide::Terrorist), 0);

    let err = run_invis_command(&mut app.world, None, &["sniper"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "multiple players found 'sniper'. be more specific or use id."
    );
    assert!(app.world.resource::<VisibilityRegistry>().is_empty());

    let summary = run_invis_command(&mut app.world, None, &["#2"]).unwrap();
    assert_eq!(summary.made_invisible, 1);
}

#[test]
fn unknown_name_and_bad_selector_report_errors() {
    let mut app = test_app();
    spawn_player(&mut app.world, 1, "alice", Some(TeamSide::Terrorist), 0);

    let missing = run_invis_command(&mut app.world, None, &["carol"]).unwrap_err();
    assert_eq!(missing.to_string(), "target 'carol' not found.");

    let bad = run_invis_command(&mut app.world, None, &["@spec"]).unwrap_err();
    assert_eq!(bad.to_string(), "invalid target selector: @spec");

    let usage = run_invis_command(&mut app.world, None, &[]).unwrap_err();
    assert_eq!(usage.to_string(), INVIS_USAGE);
}

#[test]
fn player_issuers_need_the_configured_flag() {
    let mut app = test_app();
    let admin = spawn_player(&mut app.world, 1, "admin", Some(TeamSide::Terrorist), 0);
    let kicker = spawn_player(&mut app.world, 2, "kicker", Some(TeamSide::Terrorist), 0);
    let target = spawn_player(&mut app.world, 3, "target", Some(TeamSide::CounterTerrorist), 0);
    app.world
        .entity_mut(admin.controller)
        .insert(AdminFlags::GENERIC);
    app.world
        .entity_mut(kicker.controller)
        .insert(AdminFlags::KICK);

    let denied = run_invis_command(&mut app.world, Some(kicker.controller), &["target"]);
    assert!(matches!(denied, Err(VeilError::PermissionDenied)));
    assert!(app.world.resource::<VisibilityRegistry>().is_empty());

    run_invis_command(&mut app.world, Some(admin.controller), &["target"]).unwrap();
    assert!(app
        .world
        .resource::<VisibilityRegistry>()
        .contains(target.controller));
}

#[test]
fn aliases_route_through_dispatch() {
    let mut app = test_app();
    let ghost = spawn_player(&mut app.world, 7, "ghost", Some(TeamSide::CounterTerrorist), 0);

    assert!(dispatch_command(&mut app.world, None, "css_kick", &["ghost"]).is_none());
    let reply = dispatch_command(&mut app.world, None, "css_invis", &["@ct"])
        .unwrap()
        .unwrap();
    assert_eq!(reply.made_invisible, 1);
    assert!(app
        .world
        .resource::<VisibilityRegistry>()
        .contains(ghost.controller));
}
