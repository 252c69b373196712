use std::collections::HashMap;

use kasane::strategy::{Limit, Priority};
use kasane::{Engine, MemoryCache, Provider, Resolver};

/// This demo shows how selection strategies shape the rounds of a resolve
/// call, using resolvers declared with the `Resolver` and `Provider` helpers
/// instead of hand-written resolvable types.
///
/// The same tree is resolved three times:
/// 1. With the default strategy, every ready batch runs at once.
/// 2. With `Priority`, the session check runs alone before anything else.
/// 3. With `Limit(1)`, batches are spread over one round each.

struct Services {
    prices: HashMap<&'static str, u32>,
    stock: HashMap<&'static str, u32>,
}

fn main() -> anyhow::Result<()> {
    let services = || Services {
        prices: HashMap::from([("tea", 4), ("cake", 6), ("jam", 3)]),
        stock: HashMap::from([("tea", 12), ("cake", 0), ("jam", 5)]),
    };

    // -----------------------------------------------------------------------
    // Resolvers
    // -----------------------------------------------------------------------
    let session = Provider::new("session", |_: &Services| Ok("guest".to_string()));

    let price = Resolver::batched("price", |s: &Services, items: &[&'static str]| {
        Ok(items
            .iter()
            .filter_map(|item| s.prices.get(item).map(|price| (*item, *price)))
            .collect())
    });

    let stock = Resolver::single("stock", |s: &Services, item: &&'static str| {
        s.stock
            .get(item)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown item {item}"))
    });

    let base = Engine::builder()
        .with_resolver(session.definition())
        .with_resolver(price.definition())
        .with_resolver(stock.definition());

    // -----------------------------------------------------------------------
    // The tree
    // -----------------------------------------------------------------------
    // A basket: for every item, its price and whether it is in stock, plus
    // the session of the shopper.
    let items = kasane::nodes::values(["tea", "cake", "jam"]);
    let basket = items.flat_map_each({
        let price = price.clone();
        let stock = stock.clone();
        move |item| {
            price
                .fetch(item)
                .map_with(stock.fetch(item), move |price, stock| (item, price, stock > 0))
        }
    });
    let tree = session.fetch().map_with(basket, |user, lines| (user, lines));

    // -----------------------------------------------------------------------
    // Three strategies
    // -----------------------------------------------------------------------
    let priority = Priority::new()
        .with_priority("session", 10)
        .with_priority_lower_than("stock", &"price".into());

    let engines = [
        ("all", base.build(services())),
        ("priority", base.clone().with_selection_strategy(priority).build(services())),
        ("limit(1)", base.clone().with_selection_strategy(Limit(1)).build(services())),
    ];

    for (name, engine) in &engines {
        let ((user, lines), diagnostics) =
            engine.resolve_with_diagnostics(tree.clone(), &MemoryCache::new())?;

        println!("== {name}: basket of {user}");
        for (item, price, available) in lines {
            let status = if available { "in stock" } else { "sold out" };
            println!("   {item:<5} {price:>3}  {status}");
        }
        println!("{diagnostics}");
        println!();
    }

    let (_, engine) = &engines[0];
    let (_, diagnostics) = engine.resolve_with_diagnostics(tree, &MemoryCache::new())?;
    println!("{}", diagnostics.to_json()?);

    Ok(())
}
