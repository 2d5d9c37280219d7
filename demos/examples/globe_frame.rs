// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One culling frame over a whole-globe tree.
//!
//! This example shows how to combine:
//! - a `DrawableRegistry` owning renderer-side drawables,
//! - a closure `CoordSystemAdapter` projecting degrees onto an equirectangular plane,
//! - `CullTree::query_visible` with both a rectangular view and a tilted camera footprint.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_cull_demos --example globe_frame`

use kurbo::Point;
use understory_cull::{
    CullConfig, CullTree, DrawableRef, DrawableRegistry, GeoCoord, GeoMbr, Mbr, ViewFrustum,
};

/// What the renderer would actually hold per drawable.
#[derive(Debug)]
struct Tile {
    name: &'static str,
    extent: GeoMbr,
}

fn main() {
    env_logger::init();

    // Equirectangular plane, 1 unit per 1/10 degree, origin at the south-west corner.
    let project = |g: GeoCoord| Point::new((g.lon + 180.0) * 10.0, (g.lat + 90.0) * 10.0);
    let world = Mbr::new(0.0, 0.0, 3600.0, 1800.0);
    let config = CullConfig::new(10).with_split_threshold(4);
    let mut tree = match CullTree::with_config(project, world, config) {
        Ok(tree) => tree,
        Err(err) => {
            log::error!("cannot build cull tree: {err}");
            return;
        }
    };

    let mut registry = DrawableRegistry::new();
    let tiles = [
        ("paris", (2.2, 48.8), (2.5, 48.9)),
        ("london", (-0.5, 51.3), (0.3, 51.7)),
        ("berlin", (13.1, 52.3), (13.8, 52.7)),
        ("madrid", (-3.9, 40.3), (-3.5, 40.6)),
        ("rome", (12.3, 41.8), (12.7, 42.0)),
        ("new-york", (-74.3, 40.5), (-73.7, 40.9)),
        ("tokyo", (139.5, 35.5), (139.9, 35.8)),
        ("sydney", (151.0, -34.0), (151.3, -33.7)),
        ("cape-town", (18.3, -34.2), (18.7, -33.8)),
        // Spans the prime meridian and the equator, so it stays high in the tree.
        ("gulf-of-guinea", (-5.0, -5.0), (5.0, 5.0)),
    ];
    for (name, ll, ur) in tiles {
        let extent = GeoMbr::new(GeoCoord::new(ll.0, ll.1), GeoCoord::new(ur.0, ur.1));
        let id = registry.register(Tile { name, extent });
        if let Err(err) = tree.insert(&DrawableRef::new(id, extent)) {
            log::warn!("{name} not culled: {err}");
        }
    }
    tree.dump_stats();

    // A flat view over western Europe.
    let europe = Mbr::new(
        (-12.0 + 180.0) * 10.0,
        (35.0 + 90.0) * 10.0,
        (20.0 + 180.0) * 10.0,
        (60.0 + 90.0) * 10.0,
    );
    println!("flat view over western Europe:");
    for (id, tile) in registry.resolve_all(tree.query_visible(europe)) {
        println!("  {id} {}", tile.name);
    }

    // A tilted camera: narrow near the equator, wide towards the north.
    let footprint = [
        project(GeoCoord::new(-10.0, -10.0)),
        project(GeoCoord::new(10.0, -10.0)),
        project(GeoCoord::new(40.0, 60.0)),
        project(GeoCoord::new(-40.0, 60.0)),
    ];
    let frustum = match ViewFrustum::from_points(&footprint) {
        Ok(frustum) => frustum,
        Err(err) => {
            log::error!("bad camera footprint: {err}");
            return;
        }
    };
    println!("tilted camera:");
    for (id, tile) in registry.resolve_all(tree.query_visible(&frustum)) {
        println!("  {id} {}", tile.name);
    }

    // Tear one tile down: out of the tree first, then out of the registry.
    let london = registry
        .resolve_all(tree.query_visible(europe))
        .find(|(_, t)| t.name == "london")
        .map(|(id, t)| DrawableRef::new(id, t.extent));
    if let Some(london) = london {
        match tree.remove(&london) {
            Ok(removed) => log::info!("removed {}: {removed}", london.id),
            Err(err) => log::warn!("remove failed: {err}"),
        }
        registry.destroy(london.id);
    }
    tree.dump_stats();
}
