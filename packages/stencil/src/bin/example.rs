use std::path::Path;
use std::time::Duration;

use stencil::{component, content, EntityTemplate, Localization, SystemRegistration, Universe};

#[derive(Debug, Clone, Default)]
pub struct HealthComponent {
    pub hp: i32,
}

component!(HealthComponent { hp });

#[derive(Debug, Clone, Default)]
pub struct Poisoned {
    pub damage: i32,
}

component!(Poisoned { damage });

const CONTENT: &str = r#"[
    (
        id: "goblin",
        name: "goblin-name",
        description: "goblin-desc",
        components: [
            (type: "Health", fields: { "hp": 10 }),
            (type: "Poisoned", fields: { "damage": 2 }),
        ],
    ),
]"#;

fn main() -> stencil::Result<()> {
    let mut universe = Universe::new();
    universe.components().register_all::<(HealthComponent, Poisoned)>();

    for definition in content::parse_definitions(CONTENT, Path::new("example.ron"))? {
        universe.register_definition(&definition)?;
    }

    let rock = EntityTemplate::builder("rock")
        .name("rock-name")
        .component(HealthComponent { hp: 100 })
        .build(universe.components())?;
    universe.templates_mut().register(rock);

    let mut localization = Localization::default();
    localization.load_str("goblin-name = Goblin\nrock-name = Rock\nhp-left = {$name} has {$hp} HP left");

    let mut world = universe.create_world();
    world.spawn(&mut universe, "goblin")?;
    world.spawn(&mut universe, "goblin")?;
    world.spawn(&mut universe, "rock")?;

    world.add_system(SystemRegistration::from_fn(|ctx| {
        let ids: Vec<_> = ctx.entities.query::<(HealthComponent, Poisoned)>(ctx.components)
            .map(|e| e.id())
            .collect();
        for id in ids {
            if let Some(entity) = ctx.entities.entity(id) {
                let damage = ctx.components.get_component::<Poisoned>(entity)?.damage;
                ctx.components.get_component::<HealthComponent>(entity)?.hp -= damage;
            }
        }
        Ok(())
    }).name("poison"));

    for _ in 0..3 {
        world.update(&mut universe, Duration::from_millis(16))?;
    }

    for entity in world.entities().entities() {
        let hp = universe.components().component::<HealthComponent>(entity)?.hp;
        let name = entity.display_name(&localization);
        println!("{:?}: {}", entity.id(), localization.format("hp-left", &[("name", &name), ("hp", &hp)]));
    }

    Ok(())
}
