use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    models::{CarImageQuery, CarImageResponse},
    state::AppState,
};

const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";

#[derive(Debug, Deserialize)]
struct UnsplashSearchResponse {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: Option<UnsplashUrls>,
    user: Option<UnsplashUser>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: Option<String>,
    small: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUser {
    name: Option<String>,
    links: Option<UnsplashLinks>,
}

#[derive(Debug, Deserialize)]
struct UnsplashLinks {
    html: Option<String>,
}

pub fn search_query(make: &str, model: &str, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{} {} {} car", make.trim(), model.trim(), year),
        None => format!("{} {} car", make.trim(), model.trim()),
    }
}

#[utoipa::path(
    get,
    path = "/api/carimages",
    params(CarImageQuery),
    responses(
        (status = 200, description = "Photo for the vehicle, imageUrl is null when none is available", body = CarImageResponse)
    ),
    tag = "vehicles"
)]
pub async fn get_car_image(
    State(state): State<AppState>,
    Query(params): Query<CarImageQuery>,
) -> Json<CarImageResponse> {
    let Some(access_key) = state.config.unsplash_access_key.as_deref() else {
        tracing::warn!("Unsplash API key not configured");
        return Json(CarImageResponse::default());
    };

    let query = search_query(&params.make, &params.model, params.year);

    // Cualquier fallo del proveedor se traduce en "sin imagen"
    match fetch_photo(&state.http, access_key, &query).await {
        Ok(Some(photo)) => Json(to_response(photo)),
        Ok(None) => Json(CarImageResponse::default()),
        Err(e) => {
            tracing::error!("Error fetching car image from Unsplash: {}", e);
            Json(CarImageResponse::default())
        }
    }
}

async fn fetch_photo(
    client: &reqwest::Client,
    access_key: &str,
    query: &str,
) -> Result<Option<UnsplashPhoto>, reqwest::Error> {
    let response = client
        .get(UNSPLASH_SEARCH_URL)
        .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
        .header("Authorization", format!("Client-ID {}", access_key))
        .header("Accept-Version", "v1")
        .send()
        .await?;

    if !response.status().is_success() {
        tracing::warn!("Unsplash API returned {}", response.status());
        return Ok(None);
    }

    let search: UnsplashSearchResponse = response.json().await?;
    Ok(search.results.into_iter().next())
}

fn to_response(photo: UnsplashPhoto) -> CarImageResponse {
    let image_url = photo.urls.and_then(|urls| urls.regular.or(urls.small));
    let (name, photographer_url) = match photo.user {
        Some(user) => (user.name, user.links.and_then(|links| links.html)),
        None => (None, None),
    };

    CarImageResponse {
        image_url,
        attribution: Some(format!(
            "Photo by {} on Unsplash",
            name.unwrap_or_default()
        )),
        photographer_url,
    }
}
