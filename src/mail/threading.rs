use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

use super::types::Message;

/// Order the messages of one thread depth first, oldest reply first,
/// and set each message's `level` to its depth in the reply tree.
///
/// Parents are found through In-Reply-To, falling back to the last known
/// entry in References. Messages whose parent is missing become roots.
/// Duplicate message ids keep their first occurrence.
pub fn order_thread(messages: Vec<Message>) -> Vec<Message> {
    if messages.is_empty() {
        return messages;
    }

    let mut seen = HashSet::new();
    let messages: Vec<Message> = messages
        .into_iter()
        .filter(|m| {
            let fresh = seen.insert(m.mid.clone());
            if !fresh {
                log::debug!("dropping duplicate message {}", m.mid);
            }
            fresh
        })
        .collect();

    // 1. Build message_id -> index map (parallel)
    let id_to_idx: HashMap<&str, usize> = messages
        .par_iter()
        .enumerate()
        .map(|(i, m)| (m.mid.as_str(), i))
        .collect();

    // 2. Parent of each message, avoiding self-references
    let parent: Vec<Option<usize>> = messages
        .par_iter()
        .enumerate()
        .map(|(i, m)| {
            m.in_reply_to
                .iter()
                .chain(m.references.iter().rev())
                .filter_map(|id| id_to_idx.get(id.as_str()).copied())
                .find(|&p| p != i)
        })
        .collect();

    // 3. Children sorted by date
    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, p) in parent.iter().enumerate() {
        if let Some(p) = p {
            children.entry(*p).or_default().push(i);
        }
    }
    for kids in children.values_mut() {
        kids.sort_by_key(|&k| (messages[k].timestamp, k));
    }

    // 4. Roots by date; anything left unvisited sits on a cycle and is
    //    promoted to a root.
    let mut roots: Vec<usize> = (0..messages.len())
        .filter(|&i| parent[i].is_none())
        .collect();
    roots.sort_by_key(|&r| (messages[r].timestamp, r));

    let mut order: Vec<(usize, usize)> = Vec::with_capacity(messages.len());
    let mut visited = vec![false; messages.len()];
    for root in roots {
        collect_thread_dfs(root, 0, &children, &mut visited, &mut order);
    }
    let mut stray: Vec<usize> = (0..messages.len()).filter(|&i| !visited[i]).collect();
    stray.sort_by_key(|&i| (messages[i].timestamp, i));
    for i in stray {
        if !visited[i] {
            log::warn!("reply cycle at {}", messages[i].mid);
            collect_thread_dfs(i, 0, &children, &mut visited, &mut order);
        }
    }

    let mut slots: Vec<Option<Message>> = messages.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|(idx, depth)| {
            slots[idx].take().map(|mut m| {
                m.level = depth;
                m
            })
        })
        .collect()
}

/// DFS traversal to collect messages in a thread
fn collect_thread_dfs(
    idx: usize,
    depth: usize,
    children: &HashMap<usize, Vec<usize>>,
    visited: &mut [bool],
    result: &mut Vec<(usize, usize)>,
) {
    if visited[idx] {
        return;
    }
    visited[idx] = true;
    result.push((idx, depth));

    if let Some(kids) = children.get(&idx) {
        for &child_idx in kids {
            collect_thread_dfs(child_idx, depth + 1, children, visited, result);
        }
    }
}

/// Generate tree prefix string based on depth and position
pub fn tree_prefix(depth: usize) -> String {
    if depth == 0 {
        return String::new();
    }

    if depth > 3 {
        return format!("[{}] ", depth);
    }

    let mut prefix = String::new();
    for _ in 0..depth.saturating_sub(1) {
        prefix.push_str("│  ");
    }
    prefix.push_str("└─ ");
    prefix
}
