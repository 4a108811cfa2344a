use std::hint::black_box;

use canvas_treeview::{DebugLabels, MutableTreeModel, RecordingSurface, TreeView};
use criterion::{Criterion, criterion_group, criterion_main};
use kurbo::Point;

type BenchView = TreeView<MutableTreeModel<u32>, DebugLabels, RecordingSurface>;

/// Root with `branches` children of `leaves` children each, fully expanded.
fn build_view(branches: u32, leaves: u32) -> BenchView {
    let mut model = MutableTreeModel::new(0);
    let mut next = 1;
    let mut expanded = vec![0];
    for _ in 0..branches {
        let branch = next;
        next += 1;
        model.add(0, branch, None);
        expanded.push(branch);
        for _ in 0..leaves {
            model.add(branch, next, None);
            next += 1;
        }
    }
    let mut view = TreeView::builder()
        .model(model)
        .labels(DebugLabels)
        .surface(RecordingSurface::new(800.0, 600.0))
        .build()
        .expect("bench view");
    for node in expanded {
        view.state_mut().set_expanded(node, true);
    }
    view
}

fn bench_paint(c: &mut Criterion) {
    let mut view = build_view(50, 40);
    c.bench_function("paint_2k_rows_top", |b| {
        b.iter(|| {
            view.surface_mut().clear();
            black_box(view.invalidate());
        });
    });

    view.set_scroll_offset(f64::MAX);
    c.bench_function("paint_2k_rows_bottom", |b| {
        b.iter(|| {
            view.surface_mut().clear();
            black_box(view.invalidate());
        });
    });
}

fn bench_hit_test(c: &mut Criterion) {
    let mut view = build_view(50, 40);
    view.set_scroll_offset(f64::MAX);
    let point = Point::new(200.0, 300.0);
    c.bench_function("hit_test_2k_rows_bottom", |b| {
        b.iter(|| black_box(view.hit_test_physical(black_box(point))));
    });
    c.bench_function("measure_last_node", |b| {
        b.iter(|| black_box(view.measure(black_box(2050))));
    });
}

criterion_group!(benches, bench_paint, bench_hit_test);
criterion_main!(benches);
