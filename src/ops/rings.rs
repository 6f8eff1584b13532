//! Ring perception over a [`Topology`] bond graph.
//!
//! Rings are enumerated by path-graph reduction: after pruning atoms that cannot lie on a
//! cycle, every bond becomes a path edge and atoms are removed one at a time, splicing each
//! pair of incident paths. A splice whose endpoints coincide is a simple cycle. An iterative
//! depth-first search runs alongside as an independent check; every cycle it closes must
//! also come out of the reduction. The combined result is filtered by ring size, stripped of
//! all-carbon rings, and collapsed so fused systems keep a single representative.

use crate::model::{
    ring::{Ring, RingSet},
    topology::Topology,
    types::Element,
};
use crate::ops::config::PerceptionConfig;
use crate::ops::error::Error;
use crate::ops::report::{Issue, Report};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashSet};

/// Perceives the filtered ring set of a topology.
///
/// The returned set is stamped with the topology revision it was computed from; consumers
/// call [`ensure_current`] before trusting it.
pub fn perceive_rings(topology: &Topology, config: &PerceptionConfig, report: &mut Report) -> RingSet {
    let max_size = config.max_ring_size();
    let reduced: RingSet = path_graph_cycles(topology, max_size).into_iter().collect();

    for ring in dfs_cycles(topology, max_size) {
        if !reduced.contains_key(ring.key()) {
            report.push(Issue::RingValidation {
                ring: ring.key().to_string(),
            });
        }
    }

    let candidates: Vec<Ring> = reduced
        .iter()
        .filter(|ring| config.ring_sizes.contains(&ring.len()))
        .filter(|ring| !is_all_carbon(topology, ring))
        .cloned()
        .collect();

    let mut rings = RingSet::new(topology.revision());
    for ring in remove_fused(candidates) {
        rings.insert(ring);
    }

    log::info!(
        "Perceived {} rings ({} cycles up to size {} before filtering)",
        rings.len(),
        reduced.len(),
        max_size
    );
    rings
}

/// Fails when the ring set predates the topology's latest bond mutation.
pub fn ensure_current(rings: &RingSet, topology: &Topology) -> Result<(), Error> {
    if rings.revision() != topology.revision() {
        return Err(Error::StaleRings {
            rings: rings.revision(),
            topology: topology.revision(),
        });
    }
    Ok(())
}

/// Every simple cycle with at most `max_size` atoms, found by path-graph reduction.
///
/// The result may contain the same cycle more than once; collect into a [`RingSet`] to
/// deduplicate.
pub fn path_graph_cycles(topology: &Topology, max_size: usize) -> Vec<Ring> {
    let n = topology.atom_count();
    let mut alive = prune_terminal_atoms(topology);

    let mut paths: Vec<Option<Vec<usize>>> = Vec::new();
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); n];
    for bond in topology.bonds() {
        if alive[bond.a1_idx] && alive[bond.a2_idx] {
            incident[bond.a1_idx].push(paths.len());
            incident[bond.a2_idx].push(paths.len());
            paths.push(Some(vec![bond.a1_idx, bond.a2_idx]));
        }
    }

    let mut queue: BinaryHeap<Reverse<(usize, usize)>> = (0..n)
        .filter(|&x| alive[x])
        .map(|x| Reverse((incident[x].len(), x)))
        .collect();

    let mut rings = Vec::new();
    while let Some(Reverse((degree, x))) = queue.pop() {
        if !alive[x] || incident[x].len() != degree {
            continue;
        }
        alive[x] = false;

        let mut local = Vec::with_capacity(degree);
        let mut touched = BTreeSet::new();
        for id in std::mem::take(&mut incident[x]) {
            let Some(path) = paths[id].take() else {
                continue;
            };
            let path = oriented_from(path, x);
            if let Some(&far) = path.last() {
                incident[far].retain(|&other| other != id);
                touched.insert(far);
            }
            local.push(path);
        }

        for a in 0..local.len() {
            for b in (a + 1)..local.len() {
                match splice(&local[a], &local[b], max_size) {
                    Splice::Ring(atoms) => rings.push(Ring::new(atoms)),
                    Splice::Path(atoms) => {
                        let id = paths.len();
                        let (start, end) = (atoms[0], atoms[atoms.len() - 1]);
                        incident[start].push(id);
                        incident[end].push(id);
                        touched.insert(start);
                        touched.insert(end);
                        paths.push(Some(atoms));
                    }
                    Splice::Discard => {}
                }
            }
        }

        for atom in touched {
            if alive[atom] {
                queue.push(Reverse((incident[atom].len(), atom)));
            }
        }
    }

    rings
}

/// Cycles closed by back edges of an iterative depth-first search, bounded by `max_size`.
pub fn dfs_cycles(topology: &Topology, max_size: usize) -> Vec<Ring> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Visit {
        Unvisited,
        Open,
        Closed,
    }

    let n = topology.atom_count();
    let mut visit = vec![Visit::Unvisited; n];
    let mut parent: Vec<usize> = (0..n).collect();
    let mut depth = vec![0usize; n];
    let mut rings = Vec::new();

    for root in 0..n {
        if visit[root] != Visit::Unvisited {
            continue;
        }
        visit[root] = Visit::Open;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let neighbors = topology.neighbors(node);
            if frame.1 == neighbors.len() {
                visit[node] = Visit::Closed;
                stack.pop();
                continue;
            }
            let next = neighbors[frame.1];
            frame.1 += 1;

            if node != root && parent[node] == next {
                continue;
            }
            match visit[next] {
                Visit::Unvisited => {
                    visit[next] = Visit::Open;
                    parent[next] = node;
                    depth[next] = depth[node] + 1;
                    stack.push((next, 0));
                }
                Visit::Open => {
                    if let Some(cycle) = cycle_from_back_edge(node, next, &parent, &depth, max_size)
                    {
                        rings.push(Ring::new(cycle));
                    }
                }
                Visit::Closed => {}
            }
        }
    }

    rings
}

/// Keeps rings in ascending `(size, atoms)` order, dropping any ring that shares more than
/// one atom with a ring already kept.
pub fn remove_fused(mut rings: Vec<Ring>) -> Vec<Ring> {
    rings.sort_by_cached_key(|ring| {
        let mut atoms = ring.atoms().to_vec();
        atoms.sort_unstable();
        (ring.len(), atoms)
    });

    let mut kept: Vec<Ring> = Vec::with_capacity(rings.len());
    for ring in rings {
        if kept.iter().all(|other| ring.shared_atoms(other) <= 1) {
            kept.push(ring);
        } else {
            log::debug!("Dropping fused ring {}", ring.key());
        }
    }
    kept
}

pub fn is_all_carbon(topology: &Topology, ring: &Ring) -> bool {
    ring.atoms()
        .iter()
        .all(|&idx| topology.atom(idx).element == Element::C)
}

fn prune_terminal_atoms(topology: &Topology) -> Vec<bool> {
    let n = topology.atom_count();
    let mut degree: Vec<usize> = (0..n).map(|i| topology.degree(i)).collect();
    let mut alive = vec![true; n];
    let mut pending: Vec<usize> = (0..n).filter(|&i| degree[i] <= 1).collect();

    while let Some(atom) = pending.pop() {
        if !alive[atom] {
            continue;
        }
        alive[atom] = false;
        for &neighbor in topology.neighbors(atom) {
            if alive[neighbor] {
                degree[neighbor] -= 1;
                if degree[neighbor] == 1 {
                    pending.push(neighbor);
                }
            }
        }
    }
    alive
}

fn oriented_from(mut path: Vec<usize>, start: usize) -> Vec<usize> {
    if path.first() != Some(&start) {
        path.reverse();
    }
    path
}

enum Splice {
    Ring(Vec<usize>),
    Path(Vec<usize>),
    Discard,
}

/// Joins two paths that both start at the removed atom.
fn splice(p: &[usize], q: &[usize], max_size: usize) -> Splice {
    let (Some(&p_end), Some(&q_end)) = (p.last(), q.last()) else {
        return Splice::Discard;
    };
    let closes = p_end == q_end;
    let interior = if closes { &q[1..q.len() - 1] } else { &q[1..] };

    let size = p.len() + interior.len();
    if size > max_size {
        return Splice::Discard;
    }

    let seen: HashSet<usize> = p.iter().copied().collect();
    if interior.iter().any(|atom| seen.contains(atom)) {
        return Splice::Discard;
    }

    let mut atoms: Vec<usize> = p.iter().rev().copied().collect();
    atoms.extend_from_slice(interior);
    if closes {
        if atoms.len() < 3 {
            return Splice::Discard;
        }
        Splice::Ring(atoms)
    } else {
        Splice::Path(atoms)
    }
}

fn cycle_from_back_edge(
    node: usize,
    ancestor: usize,
    parent: &[usize],
    depth: &[usize],
    max_size: usize,
) -> Option<Vec<usize>> {
    let (mut a, mut b) = (node, ancestor);
    let mut left = Vec::new();
    let mut right = Vec::new();

    while depth[a] > depth[b] {
        left.push(a);
        a = parent[a];
    }
    while depth[b] > depth[a] {
        right.push(b);
        b = parent[b];
    }
    while a != b {
        left.push(a);
        right.push(b);
        a = parent[a];
        b = parent[b];
    }
    left.push(a);

    if left.len() + right.len() > max_size {
        return None;
    }
    left.extend(right.into_iter().rev());
    Some(left)
}
