//! Graphviz export

use std::io;

use bitvec::vec::BitVec;
use hydd_core::{Edge, NO_VAR};

use crate::manager::Manager;

/// Edge tags are printed as labels; the no-tag sentinel prints as -1.
fn tag_label(dd: Edge) -> i64 {
    if dd.tag() == NO_VAR {
        -1
    } else {
        dd.tag() as i64
    }
}

impl Manager {
    /// Write a Graphviz representation of `dd`: one graph node per diagram
    /// node, low edges dashed, high edges solid, every edge labelled with
    /// its tag
    pub fn print_dot<W: io::Write>(&self, out: &mut W, dd: Edge) -> io::Result<()> {
        writeln!(out, "digraph \"DD\" {{")?;
        writeln!(out, "graph [dpi = 300];")?;
        writeln!(out, "center = true;")?;
        writeln!(out, "edge [dir = forward];")?;
        writeln!(out, "root [style=invis];")?;
        writeln!(
            out,
            "root -> {} [style=solid label=\" {}\"];",
            dd.index(),
            tag_label(dd)
        )?;

        let mut visited = BitVec::<usize>::repeat(false, self.table.high_water() as usize);
        self.print_dot_rec(out, dd, &mut visited)?;

        writeln!(out, "}}")
    }

    fn print_dot_rec<W: io::Write>(
        &self,
        out: &mut W,
        dd: Edge,
        visited: &mut BitVec,
    ) -> io::Result<()> {
        let index = dd.index();
        if visited[index as usize] {
            return Ok(());
        }
        visited.set(index as usize, true);

        if index <= 1 {
            return writeln!(
                out,
                "{index} [shape=box, style=filled, label=\"{}\"];",
                if index == 0 { "F" } else { "T" }
            );
        }

        let node = self.table.node(index);
        if node.is_leaf() {
            return writeln!(
                out,
                "{index} [shape=box, style=filled, label=\"{}:{}\"];",
                node.leaf_type(),
                node.leaf_value()
            );
        }

        writeln!(out, "{index} [label=\"{}\\n{index}\"];", node.var())?;

        self.print_dot_rec(out, node.low(), visited)?;
        self.print_dot_rec(out, node.high(), visited)?;

        writeln!(
            out,
            "{index} -> {} [style=dashed, label=\" {}\"];",
            node.low().index(),
            tag_label(node.low())
        )?;
        writeln!(
            out,
            "{index} -> {} [style=solid, label=\" {}\"];",
            node.high().index(),
            tag_label(node.high())
        )
    }
}
