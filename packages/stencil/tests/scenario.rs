//! End-to-end tests: content files in, spawned and updated entities out.

use std::fs;
use std::time::Duration;

use stencil::{
    component, content, ComponentDefinition, EntityDefinition, EntityTemplate, Error,
    Localization, SystemRegistration, Universe,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthComponent {
    pub hp: i32,
}

component!(HealthComponent { hp });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

component!(Position { x, y });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Renderable {
    pub sprite: String,
}

component!(Renderable { sprite });

fn universe() -> Universe {
    let universe = Universe::new();
    universe.components().register_all::<(HealthComponent, Position, Renderable)>();
    universe
}

#[test]
fn goblins_from_content() {
    let dir = tempfile::tempdir().unwrap();
    let content_dir = dir.path().join("content");
    let loc_dir = dir.path().join("localization").join("en-US");
    fs::create_dir_all(&content_dir).unwrap();
    fs::create_dir_all(&loc_dir).unwrap();

    fs::write(content_dir.join("monsters.ron"), r#"[
        (
            id: "goblin",
            name: "goblin-name",
            description: "goblin-desc",
            components: [
                (type: "Health", fields: { "hp": 10 }),
                (type: "Position", fields: { "x": 1.5 }),
                (type: "Shield", fields: { "amount": 3 }),
            ],
        ),
    ]"#).unwrap();
    fs::write(loc_dir.join("monsters.ftl"), "goblin-name = Goblin\ngoblin-desc = A small, angry {$colour} creature\n").unwrap();

    let mut universe = universe();
    let report = content::load_directory(&mut universe, &content_dir).unwrap();
    assert_eq!(report.registered, 1);
    assert!(report.is_clean());

    let mut localization = Localization::new("en-US");
    localization.load_directory(dir.path().join("localization")).unwrap();

    let mut world = universe.create_world();
    let first = world.spawn(&mut universe, "goblin").unwrap().id();
    let second = world.spawn(&mut universe, "goblin").unwrap().id();
    assert_ne!(first, second);

    let entity = world.entity(first).unwrap();
    assert_eq!(entity.display_name(&localization), "Goblin");
    assert_eq!(localization.format(entity.description_key(), &[("colour", &"green")]),
               "A small, angry green creature");
    assert_eq!(entity.world(), Some(world.id()));

    let components = universe.components_mut();
    components.get_component::<HealthComponent>(entity).unwrap().hp -= 4;
    assert_eq!(components.get_component::<Position>(entity).unwrap(), &mut Position { x: 1.5, y: 0.0 });

    let other = world.entity(second).unwrap();
    assert_eq!(components.get_component::<HealthComponent>(other).unwrap().hp, 10);
    assert_eq!(components.get_component::<HealthComponent>(entity).unwrap().hp, 6);
}

#[test]
fn query_requires_every_component() {
    let mut universe = universe();
    universe.register_definition(&EntityDefinition::new("tree")
        .with_component(ComponentDefinition::new("Position"))
        .with_component(ComponentDefinition::new("Renderable").with_field("sprite", "tree.png"))).unwrap();
    universe.register_definition(&EntityDefinition::new("ghost")
        .with_component(ComponentDefinition::new("Position"))).unwrap();
    universe.register_definition(&EntityDefinition::new("painting")
        .with_component(ComponentDefinition::new("Renderable"))).unwrap();

    let mut world = universe.create_world();
    for id in &["tree", "ghost", "painting", "tree"] {
        world.spawn(&mut universe, id).unwrap();
    }

    let drawn: Vec<_> = world.query::<(Position, Renderable)>(universe.components())
        .map(|e| e.reference_id().to_owned())
        .collect();
    assert_eq!(drawn, vec!["tree", "tree"]);

    assert_eq!(world.query::<Position>(universe.components()).count(), 3);
    assert_eq!(world.query::<HealthComponent>(universe.components()).count(), 0);
}

#[test]
fn template_overwrite_affects_later_spawns() {
    let mut universe = universe();
    let mut world = universe.create_world();

    let weak = EntityTemplate::builder("goblin").component(HealthComponent { hp: 5 })
        .build(universe.components()).unwrap();
    universe.templates_mut().register(weak);
    let early = world.spawn(&mut universe, "goblin").unwrap().id();

    let strong = EntityTemplate::builder("goblin").component(HealthComponent { hp: 50 })
        .build(universe.components()).unwrap();
    assert!(universe.templates_mut().register(strong).is_some());
    let late = world.spawn(&mut universe, "goblin").unwrap().id();

    let components = universe.components();
    assert_eq!(components.component::<HealthComponent>(world.entity(early).unwrap()).unwrap().hp, 5);
    assert_eq!(components.component::<HealthComponent>(world.entity(late).unwrap()).unwrap().hp, 50);
}

#[test]
fn missing_component_and_template() {
    let mut universe = universe();
    universe.register_definition(&EntityDefinition::new("rock")
        .with_component(ComponentDefinition::new("Position"))).unwrap();

    let mut world = universe.create_world();
    assert!(matches!(world.spawn(&mut universe, "dragon"), Err(Error::TemplateNotFound(_))));

    let rock = world.spawn(&mut universe, "rock").unwrap().id();
    assert_eq!(rock.id(), 0);

    let entity = world.entity(rock).unwrap();
    match universe.components_mut().get_component::<HealthComponent>(entity) {
        Err(Error::MissingComponent { entity: id, .. }) => assert_eq!(id, rock),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!universe.components().has_component::<HealthComponent>(entity));
}

#[test]
fn systems_update_components() {
    let mut universe = universe();
    universe.register_definition(&EntityDefinition::new("goblin")
        .with_component(ComponentDefinition::new("Health").with_field("hp", 10i64))).unwrap();

    let mut world = universe.create_world();
    let goblin = world.spawn(&mut universe, "goblin").unwrap().id();

    world.add_system(SystemRegistration::from_fn(|ctx| {
        for entity in ctx.entities.entities() {
            if let Some(health) = ctx.components.try_get_component::<HealthComponent>(entity) {
                health.hp -= 1;
            }
        }
        Ok(())
    }).name("bleed"));

    for _ in 0..4 {
        world.update(&mut universe, Duration::from_millis(16)).unwrap();
    }

    let entity = world.entity(goblin).unwrap();
    assert_eq!(universe.components().component::<HealthComponent>(entity).unwrap().hp, 6);

    world.destroy();
    assert!(world.entity(goblin).is_none());
}
