use argh::FromArgs;
use bsp_portal::{BspTree, CellId, CollectingVisitor, PortalTraversal, Viewport};
use log::{error, info};
use macroquad::prelude::*;
use nalgebra::Point3;
use portal_viz::{
    cell_color, draw_cell_box, draw_polygon, draw_polygon_outline, generate_room_grid, OrbitCamera,
    TreeNavigator, WalkCamera,
};
use simplelog::TermLogger;

/// Walk through a grid of rooms and watch the portal traversal
#[derive(Debug, FromArgs)]
struct Args {
    /// verbose level: off, error, warn, info, debug, trace
    #[argh(option)]
    verbose: Option<log::LevelFilter>,
    /// rooms along x
    #[argh(option, default = "6")]
    cols: usize,
    /// rooms along y
    #[argh(option, default = "6")]
    rows: usize,
    /// room edge length
    #[argh(option, default = "10.0")]
    size: f32,
    /// vertical field of view in degrees
    #[argh(option, default = "70.0")]
    fov: f32,
}

fn init_logging(level: log::LevelFilter) {
    let result = TermLogger::init(
        level,
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    if let Err(err) = result {
        eprintln!("logger already initialized: {err}");
    }
}

/// Toggles the vis-block flag of the room just ahead of the walker.
fn toggle_block_ahead(tree: &mut BspTree, walker: &WalkCamera, size: f32) {
    let ahead = walker.position + walker.forward() * size;
    let Some(cell) = tree.find_leaf(ahead) else {
        return;
    };
    let toggled = tree
        .is_vis_blocked(cell)
        .and_then(|blocked| tree.block_vision(cell, !blocked).map(|()| !blocked));
    match toggled {
        Ok(blocked) => info!("cell {cell} vis-block {}", if blocked { "on" } else { "off" }),
        Err(err) => error!("failed to toggle vis-block on {cell}: {err}"),
    }
}

#[macroquad::main("Portal Traversal")]
async fn main() {
    let args: Args = argh::from_env();
    init_logging(args.verbose.unwrap_or(log::LevelFilter::Info));

    let mut tree = match generate_room_grid(args.cols, args.rows, args.size) {
        Ok(tree) => tree,
        Err(err) => {
            error!("could not build the room grid: {err}");
            return;
        }
    };

    let half = args.size * 0.5;
    let fov = args.fov.to_radians();
    let mut walker = WalkCamera::new(Point3::new(half, half, half * 0.7), 0.0);
    let extent = vec3(args.cols as f32 * args.size, args.rows as f32 * args.size, 0.0);
    let mut overview = OrbitCamera::new(extent.length(), -0.8, 0.9)
        .with_zoom(5.0, args.size, extent.length() * 3.0)
        .with_target(extent * 0.5);
    let mut navigator = TreeNavigator::new();
    let mut traversal = PortalTraversal::new();
    let mut show_overview = true;

    loop {
        let dt = get_frame_time();
        walker.update(dt);
        navigator.update(&tree);
        if show_overview {
            overview.update();
        }
        if is_key_pressed(KeyCode::Tab) {
            show_overview = !show_overview;
        }
        if is_key_pressed(KeyCode::V) {
            toggle_block_ahead(&mut tree, &walker, args.size);
        }

        let viewport = Viewport::new(screen_width() as i32, screen_height() as i32);
        if viewport.width < 1 || viewport.height < 1 {
            next_frame().await;
            continue;
        }
        let view = walker.view_camera(fov, viewport.aspect()).view_setup(viewport);
        let mut visitor = CollectingVisitor::new();
        let started = get_time();
        let visible: Vec<CellId> = match traversal.traverse_with(&tree, &view, true, &mut visitor) {
            Ok(visible) => visible.iter().copied().collect(),
            Err(err) => {
                error!("traversal failed: {err}");
                Vec::new()
            }
        };
        let elapsed_ms = (get_time() - started) * 1000.0;

        clear_background(Color::from_rgba(20, 20, 30, 255));
        if show_overview {
            set_camera(&overview.to_camera3d());
        } else {
            set_camera(&walker.to_camera3d(fov));
        }

        for cell in tree.cells() {
            let Some(bounds) = cell.bounds() else {
                continue;
            };
            let color = if visible.contains(&cell.id()) {
                if cell.is_vis_blocked() { RED } else { cell_color(cell.id()) }
            } else {
                Color::from_rgba(60, 60, 70, 255)
            };
            draw_cell_box(bounds, color);
        }

        for cell in &visible {
            let Ok(cell) = tree.cell(*cell) else {
                continue;
            };
            for portal in cell.out_portals().filter_map(|id| tree.portal(id).ok()) {
                let seen = traversal
                    .portal_rect(portal.id())
                    .is_some_and(|info| !info.culled && !info.screen_rect.is_empty());
                if seen {
                    draw_polygon(portal.polygon(), Color::from_rgba(80, 200, 255, 90));
                }
                draw_polygon_outline(portal.polygon(), SKYBLUE);
            }
        }

        navigator.render(&tree, YELLOW);
        if show_overview {
            walker.draw_marker(WHITE);
        }

        set_default_camera();

        draw_text(
            &format!(
                "Visible: {} / {} cells | {} portals projected | {:.3} ms",
                visible.len(),
                tree.cell_count(),
                visitor.portals().len(),
                elapsed_ms
            ),
            10.0,
            25.0,
            20.0,
            WHITE,
        );
        draw_text(
            &format!(
                "Viewer in {} | depth {}",
                tree.find_leaf(walker.position)
                    .map_or_else(|| "void".to_string(), |c| c.to_string()),
                tree.depth()
            ),
            10.0,
            45.0,
            18.0,
            GRAY,
        );

        navigator.draw_ui(&tree, 70.0);

        draw_text(
            "WASD move, arrows look | [Tab] overview | [V] block room ahead",
            10.0,
            155.0,
            16.0,
            DARKGRAY,
        );
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 175.0, 16.0, DARKGRAY);

        next_frame().await
    }
}
