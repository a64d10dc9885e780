use serde_json::{json, Value};
use types::Offset;

pub const OPERATION_NAME: &str = "SlugKuratorGroup";

const SLUG_KURATOR_GROUP_QUERY: &str = "query SlugKuratorGroup($slug: String!, $limit: Int!, $offset: Int!, $sort: GameSortEnum) {
  slugKuratorGroup(slug: $slug) {
    id
    slug
    name
    gameCount
    groupGamesList(limit: $limit, offset: $offset, sort: $sort) {
      id
      game {
        id
        name
        slug
        thumbnailUrl
        thumbnailBlurHash
        isBlocked
        isWidgetEnabled
        playerCount
        groupGames {
          group {
            slug
            translation
            type
          }
        }
      }
    }
  }
}";

/// Request body for one page of a provider's games, sorted by popularity.
pub fn games_query(provider_slug: &str, offset: Offset, limit: u64) -> Value {
    json!({
        "operationName": OPERATION_NAME,
        "query": SLUG_KURATOR_GROUP_QUERY,
        "variables": {
            "slug": provider_slug,
            "limit": limit,
            "offset": offset,
            "sort": "popular",
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_games_query_variables() {
        let body = games_query("push-gaming", 78, 22);
        assert_eq!(body["operationName"], OPERATION_NAME);
        assert_eq!(body["variables"]["slug"], "push-gaming");
        assert_eq!(body["variables"]["offset"], 78);
        assert_eq!(body["variables"]["limit"], 22);
        assert!(body["query"]
            .as_str()
            .is_some_and(|q| q.contains("groupGamesList(limit: $limit, offset: $offset")));
    }
}
