// Drag-and-drop example: paint a tree into a buffer, drag a node onto another
// and apply the move once the listeners accept it.
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::prelude::Buffer;
use ratatui::widgets::{Block, StatefulWidget};

use canvas_treeview::prelude::*;

// Names double as node ids.
fn model() -> MutableTreeModel<&'static str> {
    let mut model = MutableTreeModel::new("root");
    model.add("root", "docs", None);
    model.add("root", "src", None);
    model.add("docs", "guide.md", None);
    model.add("src", "lib.rs", None);
    model.add("src", "main.rs", None);
    model
}

fn print(buffer: &Buffer) {
    for y in buffer.area.top()..buffer.area.bottom() {
        let line: String = (buffer.area.left()..buffer.area.right())
            .map(|x| buffer[(x, y)].symbol())
            .collect();
        println!("{line}");
    }
}

fn main() -> canvas_treeview::Result<()> {
    let labels = |_: &MutableTreeModel<&'static str>, id: &'static str| id.to_owned();
    let mut view = TreeView::builder()
        .model(model())
        .labels(labels)
        .surface(BufferSurface::new(1, 1, CellSize::default()))
        .build()?;

    // Refuse moving anything into `docs`.
    view.set_dnd_policy(Box::new(|_source: &'static str, targets: &[&'static str]| {
        Some(!targets.contains(&"docs"))
    }));
    view.add_node_moved_listener(Box::new(|args: &NodeMovedArgs<&'static str>| {
        if args.nodes.iter().any(|moved| moved.node == "main.rs") {
            NodeMovedResult::reject("main.rs stays where it is")
        } else {
            NodeMovedResult::accept()
        }
    }));

    // Expand everything from the keyboard: select root, toggle, walk down.
    let keys = [KeyCode::Down, KeyCode::Enter, KeyCode::Down, KeyCode::Right];
    for code in keys {
        view.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }
    view.state_mut().set_expanded("src", true);

    let area = Rect::new(0, 0, 40, 10);
    let mut buffer = Buffer::empty(area);
    let canvas = TreeCanvas::new().block(Block::bordered().title("files"));
    canvas.render(area, &mut buffer, &mut view);
    print(&buffer);

    // Drag `lib.rs` onto the middle of the `src` row to drop it inside.
    let viewport = *view.viewport();
    let from = view.measure("lib.rs").item.to_physical(&viewport).center();
    let to = view.measure("src").item.to_physical(&viewport).center();
    view.pointer_down(from, false);
    view.pointer_move(to);
    if let Some(outcome) = view.pointer_up(to) {
        println!("drop: {:?} -> {:?}", outcome.args.placement, outcome.result);
        if outcome.result.accepted {
            view.model_mut().apply_moved(&outcome.args);
            view.dispatch_pending();
        }
    }

    let mut buffer = Buffer::empty(area);
    TreeCanvas::new()
        .block(Block::bordered().title("files"))
        .render(area, &mut buffer, &mut view);
    print(&buffer);
    Ok(())
}
