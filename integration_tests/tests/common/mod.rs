#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use bevy::prelude::*;
use veil_core::{
    HeldItems, PlayerController, PlayerHost, PlayerPawn, RenderColor, SpottedState, TeamSide,
    TransmitFrame,
};

static INIT: Once = Once::new();

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("test_veil_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test veil config at {}",
            config_path.display()
        );

        std::env::set_var("VEIL_CONFIG_PATH", &config_path);
    });
}

#[derive(Debug, Clone)]
pub struct TestPlayer {
    pub controller: Entity,
    pub pawn: Entity,
    pub items: Vec<Entity>,
}

pub fn spawn_player(
    world: &mut World,
    user_id: u32,
    name: &str,
    side: Option<TeamSide>,
    items: usize,
) -> TestPlayer {
    let items: Vec<Entity> = (0..items)
        .map(|_| world.spawn(RenderColor::WHITE).id())
        .collect();
    let controller = world.spawn_empty().id();
    let pawn = world
        .spawn((
            PlayerPawn { controller },
            HeldItems(items.clone()),
            RenderColor::WHITE,
            SpottedState {
                spotted: true,
                spotted_by_mask: [0b110, 0b1],
            },
        ))
        .id();
    world.entity_mut(controller).insert(PlayerController {
        user_id,
        name: name.to_string(),
        side,
        pawn: Some(pawn),
    });
    TestPlayer {
        controller,
        pawn,
        items,
    }
}

/// Offer every live pawn and held item to every valid receiver.
pub fn fill_frame(world: &mut World) {
    let mut players = world.query_filtered::<Entity, With<PlayerController>>();
    let controllers: Vec<Entity> = {
        let world: &World = world;
        players
            .iter(world)
            .filter(|controller| world.is_valid(*controller))
            .collect()
    };
    let mut everything = Vec::new();
    for controller in &controllers {
        if let Some(pawn) = world.pawn_of(*controller) {
            everything.push(pawn);
            everything.extend(world.held_items(pawn));
        }
    }
    let mut frame = world.resource_mut::<TransmitFrame>();
    frame.clear();
    for controller in controllers {
        frame.push(controller, everything.iter().copied());
    }
}

pub fn alpha(world: &World, entity: Entity) -> u8 {
    world
        .get::<RenderColor>(entity)
        .map(|color| color.a)
        .unwrap_or_default()
}

pub fn receives(world: &World, receiver: Entity, entity: Entity) -> bool {
    world
        .resource::<TransmitFrame>()
        .for_receiver(receiver)
        .is_some_and(|entities| entities.contains(&entity))
}
