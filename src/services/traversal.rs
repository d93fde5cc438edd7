//! Graph walks shared by several services.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use crate::constants::*;
use crate::domain::{DatabaseObject, DbId, ObjectGraph};
use crate::error::Result;
use crate::graph::GraphStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

fn push_unique(out: &mut Vec<DatabaseObject>, object: DatabaseObject) {
    if !out.iter().any(|o| o.db_id == object.db_id) {
        out.push(object);
    }
}

/// Loads `root` plus every object within `depth` outgoing hops.
pub async fn load_graph(
    store: &dyn GraphStore,
    root: DatabaseObject,
    depth: usize,
) -> Result<ObjectGraph> {
    let root_id = root.db_id;
    let mut graph = ObjectGraph::new(root);
    expand(store, &mut graph, root_id, depth).await?;
    Ok(graph)
}

/// Adds the neighbourhood of `start` (already in `graph`) to `graph`.
pub async fn expand(
    store: &dyn GraphStore,
    graph: &mut ObjectGraph,
    start: DbId,
    depth: usize,
) -> Result<()> {
    let mut frontier = vec![start];
    for _ in 0..depth {
        let mut next = Vec::new();
        for id in frontier {
            for related in store.outgoing(id, &[]).await? {
                let target = related.object.db_id;
                if graph.get(target).is_none() {
                    graph.insert(related.object);
                    next.push(target);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    Ok(())
}

/// Every event below `event` through `hasEvent`, depth first in stored
/// order, each once.
pub async fn contained_events(store: &dyn GraphStore, event: DbId) -> Result<Vec<DatabaseObject>> {
    let mut seen = HashSet::from([event]);
    let mut out = Vec::new();
    walk_events(store, event, &mut seen, &mut out).await?;
    Ok(out)
}

fn walk_events<'a>(
    store: &'a dyn GraphStore,
    event: DbId,
    seen: &'a mut HashSet<DbId>,
    out: &'a mut Vec<DatabaseObject>,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        for child in store.outgoing(event, &[HAS_EVENT]).await? {
            if seen.insert(child.object.db_id) {
                let id = child.object.db_id;
                out.push(child.object);
                walk_events(store, id, seen, out).await?;
            }
        }
        Ok(())
    })
}

/// Reaction-like events contained in (or equal to) `event`.
pub async fn reactions_of(store: &dyn GraphStore, event: &DatabaseObject) -> Result<Vec<DatabaseObject>> {
    if event.is_a(REACTION_LIKE_EVENT) {
        return Ok(vec![event.clone()]);
    }
    Ok(contained_events(store, event.db_id)
        .await?
        .into_iter()
        .filter(|e| e.is_a(REACTION_LIKE_EVENT))
        .collect())
}

/// Physical entities taking part in a reaction: inputs, outputs, catalysts
/// and regulators, each once in that order.
pub async fn reaction_participants(
    store: &dyn GraphStore,
    reaction: DbId,
) -> Result<Vec<DatabaseObject>> {
    let mut out: Vec<DatabaseObject> = Vec::new();
    for relation in [INPUT, OUTPUT] {
        for related in store.outgoing(reaction, &[relation]).await? {
            push_unique(&mut out, related.object);
        }
    }
    for activity in store.outgoing(reaction, &[CATALYST_ACTIVITY]).await? {
        for pe in store
            .outgoing(activity.object.db_id, &[PHYSICAL_ENTITY_REL])
            .await?
        {
            push_unique(&mut out, pe.object);
        }
    }
    for regulation in store.outgoing(reaction, &[REGULATED_BY]).await? {
        for regulator in store.outgoing(regulation.object.db_id, &[REGULATOR]).await? {
            push_unique(&mut out, regulator.object);
        }
    }
    Ok(out)
}

/// `entity` and every structure (complex, set, polymer) that contains it.
pub async fn containers(store: &dyn GraphStore, entity: DbId) -> Result<Vec<DbId>> {
    let mut seen = vec![entity];
    let mut stack = vec![entity];
    while let Some(current) = stack.pop() {
        for parent in store.incoming(current, STRUCTURE_RELATIONS).await? {
            if !seen.contains(&parent.object.db_id) {
                seen.push(parent.object.db_id);
                stack.push(parent.object.db_id);
            }
        }
    }
    Ok(seen)
}

/// Everything inside a structure, depth first in stored order.
pub async fn subunits(store: &dyn GraphStore, entity: DbId) -> Result<Vec<DatabaseObject>> {
    let mut out: Vec<DatabaseObject> = Vec::new();
    let mut seen = HashSet::from([entity]);
    walk_subunits(store, entity, &mut seen, &mut out).await?;
    Ok(out)
}

fn walk_subunits<'a>(
    store: &'a dyn GraphStore,
    entity: DbId,
    seen: &'a mut HashSet<DbId>,
    out: &'a mut Vec<DatabaseObject>,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        for child in store.outgoing(entity, STRUCTURE_RELATIONS).await? {
            if seen.insert(child.object.db_id) {
                let id = child.object.db_id;
                out.push(child.object);
                walk_subunits(store, id, seen, out).await?;
            }
        }
        Ok(())
    })
}

/// Reference entities of an entity, looking through structures.
pub async fn reference_entities(
    store: &dyn GraphStore,
    entity: &DatabaseObject,
) -> Result<Vec<DatabaseObject>> {
    let mut members = vec![entity.clone()];
    members.extend(subunits(store, entity.db_id).await?);
    let mut out: Vec<DatabaseObject> = Vec::new();
    for member in members {
        for reference in store.outgoing(member.db_id, &[REFERENCE_ENTITY_REL]).await? {
            push_unique(&mut out, reference.object);
        }
    }
    Ok(out)
}

/// Reaction-like events in which any of `entities` takes part.
pub async fn reactions_with(
    store: &dyn GraphStore,
    entities: &[DbId],
) -> Result<Vec<DatabaseObject>> {
    let mut reactions: Vec<DatabaseObject> = Vec::new();
    let add = |object: DatabaseObject, reactions: &mut Vec<DatabaseObject>| {
        if object.is_a(REACTION_LIKE_EVENT) {
            push_unique(reactions, object);
        }
    };
    for entity in entities {
        for related in store.incoming(*entity, PARTICIPANT_RELATIONS).await? {
            add(related.object, &mut reactions);
        }
        for activity in store.incoming(*entity, &[PHYSICAL_ENTITY_REL]).await? {
            for reaction in store
                .incoming(activity.object.db_id, &[CATALYST_ACTIVITY])
                .await?
            {
                add(reaction.object, &mut reactions);
            }
        }
        for regulation in store.incoming(*entity, &[REGULATOR]).await? {
            for reaction in store
                .incoming(regulation.object.db_id, &[REGULATED_BY])
                .await?
            {
                add(reaction.object, &mut reactions);
            }
        }
    }
    reactions.sort_by_key(|r| r.db_id);
    Ok(reactions)
}

/// Pathways directly holding any of `events` through `hasEvent`.
pub async fn parent_pathways(
    store: &dyn GraphStore,
    events: &[DatabaseObject],
) -> Result<Vec<DatabaseObject>> {
    let mut pathways: Vec<DatabaseObject> = Vec::new();
    for event in events {
        for parent in store.incoming(event.db_id, &[HAS_EVENT]).await? {
            if parent.object.is_a(PATHWAY) && !pathways.iter().any(|p| p.db_id == parent.object.db_id) {
                pathways.push(parent.object);
            }
        }
    }
    pathways.sort_by_key(|p| p.db_id);
    Ok(pathways)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_graph;

    fn ids(objects: &[DatabaseObject]) -> Vec<DbId> {
        objects.iter().map(|o| o.db_id).collect()
    }

    #[tokio::test]
    async fn test_contained_events_preorder_without_duplicates() {
        let graph = fixture_graph();
        let events = contained_events(&graph, 100).await.unwrap();
        assert_eq!(ids(&events), vec![200, 300, 310, 210]);
    }

    #[tokio::test]
    async fn test_reaction_participants() {
        let graph = fixture_graph();
        let participants = reaction_participants(&graph, 300).await.unwrap();
        assert_eq!(ids(&participants), vec![500, 510, 550, 570]);
    }

    #[tokio::test]
    async fn test_subunits_and_containers() {
        let graph = fixture_graph();
        let inside = subunits(&graph, 550).await.unwrap();
        assert_eq!(ids(&inside), vec![530, 560, 540]);
        let outside = containers(&graph, 540).await.unwrap();
        assert_eq!(outside, vec![540, 560, 550]);
    }

    #[tokio::test]
    async fn test_reactions_with_catalyst_and_regulator() {
        let graph = fixture_graph();
        // HK1 only reaches reaction 300 as part of the catalyst complex
        let hk1 = containers(&graph, 530).await.unwrap();
        assert_eq!(ids(&reactions_with(&graph, &hk1).await.unwrap()), vec![300]);
        // insulin regulates reaction 300
        assert_eq!(ids(&reactions_with(&graph, &[570]).await.unwrap()), vec![300]);
        // G6P is produced by 300 and consumed by 310
        assert_eq!(ids(&reactions_with(&graph, &[510]).await.unwrap()), vec![300, 310]);
    }

    #[tokio::test]
    async fn test_load_graph_depth() {
        let graph = fixture_graph();
        let root = graph.find_by_db_ids(&[300]).await.unwrap().remove(0);
        let loaded = load_graph(&graph, root, 1).await.unwrap();
        assert!(loaded.get(500).is_some());
        assert!(loaded.get(600).is_some());
        // second hop not loaded
        assert!(loaded.get(550).is_none());
    }
}
