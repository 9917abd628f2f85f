use bevy::prelude::*;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use veil_core::{
    build_headless_app, run_invis_command, run_tick, HeldItems, PlayerController, PlayerPawn,
    RenderColor, RevealAction, RevealEvent, SpottedState, TeamSide, TransmitFrame,
};

fn populate(app: &mut App, players: u32) -> Vec<Entity> {
    let mut controllers = Vec::with_capacity(players as usize);
    let mut everything = Vec::new();
    for user_id in 0..players {
        let side = if user_id % 2 == 0 {
            TeamSide::Terrorist
        } else {
            TeamSide::CounterTerrorist
        };
        let items: Vec<Entity> = (0..3)
            .map(|_| app.world.spawn(RenderColor::WHITE).id())
            .collect();
        everything.extend(items.iter().copied());
        let controller = app.world.spawn_empty().id();
        let pawn = app
            .world
            .spawn((
                PlayerPawn { controller },
                HeldItems(items),
                RenderColor::WHITE,
                SpottedState::default(),
            ))
            .id();
        everything.push(pawn);
        app.world.entity_mut(controller).insert(PlayerController {
            user_id,
            name: format!("player{user_id}"),
            side: Some(side),
            pawn: Some(pawn),
        });
        controllers.push(controller);
    }

    let mut frame = app.world.resource_mut::<TransmitFrame>();
    for controller in &controllers {
        frame.push(*controller, everything.iter().copied());
    }
    controllers
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for players in [16u32, 64, 256] {
        group.bench_with_input(
            BenchmarkId::new("managed_players", players),
            &players,
            |b, &players| {
                b.iter_batched(
                    || {
                        let mut app = build_headless_app();
                        let controllers = populate(&mut app, players);
                        let _ = run_invis_command(&mut app.world, None, &["@all"]);
                        // Half the players are mid-fade, the rest fully faded.
                        for (i, controller) in controllers.iter().enumerate() {
                            let action = if i % 2 == 0 {
                                RevealAction::Sound { duration: 1.0 }
                            } else {
                                RevealAction::BulletImpact
                            };
                            app.world.send_event(RevealEvent::new(*controller, action));
                        }
                        run_tick(&mut app, 0.0);
                        app
                    },
                    |mut app| {
                        run_tick(&mut app, 1.0);
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(tick_benches, bench_tick);
criterion_main!(tick_benches);
