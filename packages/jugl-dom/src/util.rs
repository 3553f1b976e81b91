use crate::{Document, NodeData};

// Debug print a Document subtree
pub fn walk_tree(doc: &Document, indent: usize, node_id: usize) {
    let Some(node) = doc.get_node(node_id) else {
        return;
    };

    // Skip all-whitespace text nodes entirely
    if let NodeData::Text(data) = &node.data {
        if data.content.chars().all(|c| c.is_ascii_whitespace()) {
            return;
        }
    }

    print!("{}", " ".repeat(indent));
    let id = node.id;
    match &node.data {
        NodeData::Document => println!("#Document {id}"),

        NodeData::Fragment => println!("#Fragment {id}"),

        NodeData::Text(data) => {
            let content = data.content.trim();
            if content.chars().count() > 10 {
                let head: String = content.chars().take(10).collect();
                println!("#text {id}: {}...", head.escape_default())
            } else {
                println!("#text {id}: {}", content.escape_default())
            }
        }

        NodeData::Comment { .. } => println!("<!-- COMMENT {id} -->"),

        NodeData::ProcessingInstruction { target, .. } => println!("<?{target} {id}?>"),

        NodeData::Element(data) => {
            print!("<{} {id}", data.qualified_name());
            for attr in data.attrs.iter() {
                print!(" {}=\"{}\"", attr.qualified_name(), attr.value);
            }
            if !node.children.is_empty() {
                println!(">");
            } else {
                println!("/>");
            }
        }
    }

    if !node.children.is_empty() {
        for child_id in node.children.iter() {
            walk_tree(doc, indent + 2, *child_id);
        }

        if let NodeData::Element(data) = &node.data {
            println!("{}</{}>", " ".repeat(indent), data.qualified_name());
        }
    }
}
