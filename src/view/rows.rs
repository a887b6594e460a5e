//! Per-row decorations for the thread tree

use serde::{Deserialize, Serialize};

use crate::facade::ThreadId;

/// Derived state of one thread, as the tree shows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadRow {
    pub thread: ThreadId,
    pub name: String,
    pub current: bool,
    pub suspended: bool,
    pub at_hit: bool,
    pub in_deadlock: bool,
}

/// A node of the thread tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNode {
    Thread(ThreadRow),
    Group { name: String, threads: Vec<ThreadRow> },
}

/// Colored bar painted at the left edge of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBar {
    None,
    Current,
    Deadlock,
    Hit,
}

/// Clickable icon at the right edge of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowIcon {
    /// Row is running; clicking suspends it
    Suspend,
    /// Row is suspended; clicking resumes it
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowDecoration {
    pub bar: ColorBar,
    pub icon: Option<RowIcon>,
}

fn icon_for(suspended: bool) -> RowIcon {
    if suspended {
        RowIcon::Resume
    } else {
        RowIcon::Suspend
    }
}

pub fn decorate(node: &ViewNode) -> RowDecoration {
    match node {
        ViewNode::Thread(row) => {
            // Deadlock outranks a hit: a deadlocked hit will never move on
            let bar = if row.current {
                ColorBar::Current
            } else if row.in_deadlock {
                ColorBar::Deadlock
            } else if row.at_hit {
                ColorBar::Hit
            } else {
                ColorBar::None
            };
            RowDecoration {
                bar,
                icon: Some(icon_for(row.suspended)),
            }
        }
        ViewNode::Group { threads, .. } => RowDecoration {
            bar: ColorBar::None,
            icon: if threads.is_empty() {
                None
            } else {
                Some(icon_for(threads.iter().all(|t| t.suspended)))
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64) -> ThreadRow {
        ThreadRow {
            thread: ThreadId(id),
            name: format!("t{id}"),
            current: false,
            suspended: false,
            at_hit: false,
            in_deadlock: false,
        }
    }

    #[test]
    fn test_running_thread() {
        let deco = decorate(&ViewNode::Thread(row(1)));
        assert_eq!(deco.bar, ColorBar::None);
        assert_eq!(deco.icon, Some(RowIcon::Suspend));
    }

    #[test]
    fn test_bar_precedence() {
        let mut r = row(1);
        r.suspended = true;
        r.at_hit = true;
        assert_eq!(decorate(&ViewNode::Thread(r.clone())).bar, ColorBar::Hit);

        r.in_deadlock = true;
        assert_eq!(decorate(&ViewNode::Thread(r.clone())).bar, ColorBar::Deadlock);

        r.current = true;
        let deco = decorate(&ViewNode::Thread(r));
        assert_eq!(deco.bar, ColorBar::Current);
        assert_eq!(deco.icon, Some(RowIcon::Resume));
    }

    #[test]
    fn test_group_icon() {
        let mut a = row(1);
        let mut b = row(2);
        a.suspended = true;
        let group = ViewNode::Group {
            name: "main".to_string(),
            threads: vec![a.clone(), b.clone()],
        };
        assert_eq!(decorate(&group).icon, Some(RowIcon::Suspend));

        b.suspended = true;
        let group = ViewNode::Group {
            name: "main".to_string(),
            threads: vec![a, b],
        };
        let deco = decorate(&group);
        assert_eq!(deco.icon, Some(RowIcon::Resume));
        assert_eq!(deco.bar, ColorBar::None);

        let empty = ViewNode::Group {
            name: "system".to_string(),
            threads: Vec::new(),
        };
        assert_eq!(decorate(&empty).icon, None);
    }
}
