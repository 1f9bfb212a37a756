//! Map surface state: tile layer and viewport memory.

use eframe::egui;
use tracing::warn;
use walkers::sources::{Attribution, OpenStreetMap, TileSource};
use walkers::{HttpTiles, MapMemory};
use waypost_core::types::LatLng;

/// Tile source backed by a `{z}/{x}/{y}` URL template from the config.
#[derive(Debug, Clone)]
pub struct TemplateTileSource {
    url_pattern: String,
}

impl TemplateTileSource {
    pub fn new(url_pattern: String) -> Self {
        Self { url_pattern }
    }
}

impl TileSource for TemplateTileSource {
    fn tile_url(&self, tile_id: walkers::TileId) -> String {
        self.url_pattern
            .replace("{z}", &tile_id.zoom.to_string())
            .replace("{x}", &tile_id.x.to_string())
            .replace("{y}", &tile_id.y.to_string())
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "Configured tile provider",
            url: "",
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// Map surface state: HTTP tile downloader and viewport memory.
pub struct MapPanelState {
    /// HTTP tile downloader (initialized on first frame)
    pub tiles: Option<HttpTiles>,
    /// Viewport state: zoom, center, drag
    pub map_memory: MapMemory,
    /// Tile URL template overriding OpenStreetMap
    tile_url: Option<String>,
    /// Where the map opens
    pub initial_center: LatLng,
}

impl MapPanelState {
    pub fn new(initial_center: LatLng, zoom: f64, tile_url: Option<String>) -> Self {
        let mut map_memory = MapMemory::default();
        if map_memory.set_zoom(zoom).is_err() {
            warn!(zoom, "unsupported zoom level, keeping default");
        }
        Self {
            tiles: None,
            map_memory,
            tile_url,
            initial_center,
        }
    }

    /// Initializes tiles if not already initialized.
    pub fn ensure_tiles(&mut self, ctx: &egui::Context) {
        if self.tiles.is_none() {
            self.tiles = Some(match &self.tile_url {
                Some(url) => {
                    HttpTiles::new(TemplateTileSource::new(url.clone()), ctx.clone())
                }
                None => HttpTiles::new(OpenStreetMap, ctx.clone()),
            });
        }
    }

    /// Pans the viewport to a location.
    pub fn pan_to(&mut self, location: LatLng) {
        self.map_memory
            .center_at(walkers::lat_lon(location.lat, location.lng));
    }
}
