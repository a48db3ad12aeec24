use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Number, Value as JsonValue, json};

use crate::{
    error::Result,
    types::{Facet, ProcessResult},
};

fn number(value: f64) -> JsonValue {
    Number::from_f64(value).map(JsonValue::Number).unwrap_or(JsonValue::Null)
}

impl ProcessResult {
    /// One polygon feature per live facet, in wall coordinates
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let facets = &self.facet_result;
        let mut features = Vec::new();

        for facet in facets.live_facets() {
            let mut ring: Vec<Vec<f64>> = facets
                .full_path(facet.id)
                .iter()
                .map(|coord| vec![coord.x, coord.y])
                .collect();
            if let Some(first) = ring.first().cloned() {
                if ring.last() != Some(&first) {
                    ring.push(first);
                }
            }
            let geometry = (!ring.is_empty()).then(|| Geometry::new(Value::Polygon(vec![ring])));

            features.push(Feature {
                bbox: None,
                geometry,
                id: Some(geojson::feature::Id::Number(Number::from(facet.id))),
                properties: Some(self.facet_properties(facet)),
                foreign_members: None,
            });
        }

        let mut foreign_members = Map::new();
        foreign_members.insert("image_width".to_string(), JsonValue::from(facets.width));
        foreign_members.insert("image_height".to_string(), JsonValue::from(facets.height));
        foreign_members.insert("facet_count".to_string(), JsonValue::from(features.len()));
        foreign_members.insert("palette".to_string(), json!(self.colors_by_index));

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }

    fn facet_properties(&self, facet: &Facet) -> Map<String, JsonValue> {
        let mut properties = Map::new();
        properties.insert("id".to_string(), JsonValue::from(facet.id));
        properties.insert("color_index".to_string(), JsonValue::from(facet.color));
        properties.insert("color".to_string(), json!(self.facet_color(facet)));
        properties.insert("point_count".to_string(), JsonValue::from(facet.point_count));
        if let Some(point) = facet.label_point {
            properties.insert("label_x".to_string(), number(point.x));
            properties.insert("label_y".to_string(), number(point.y));
        }
        if let Some(bounds) = facet.label_bounds {
            properties.insert(
                "label_bounds".to_string(),
                JsonValue::Array(
                    [bounds.min().x, bounds.min().y, bounds.max().x, bounds.max().y]
                        .into_iter()
                        .map(number)
                        .collect(),
                ),
            );
        }
        properties
    }

    /// Export to GeoJSON and serialize to JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        let geojson = self.to_geojson()?;
        Ok(serde_json::to_string_pretty(&geojson)?)
    }

    /// Save GeoJSON to file
    pub fn save_geojson(&self, path: &str) -> Result<()> {
        let geojson_string = self.to_geojson_string()?;
        std::fs::write(path, geojson_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use crate::{pipeline::Pipeline, settings::Settings};

    fn processed() -> crate::types::ProcessResult {
        let image = RgbaImage::from_fn(10, 6, |x, _| {
            if x < 5 {
                Rgba([200, 30, 30, 255])
            } else {
                Rgba([30, 30, 200, 255])
            }
        });
        let settings = Settings {
            cluster_count: 2,
            random_seed: Some(11),
            ..Settings::default()
        };
        Pipeline::builder().with_settings(settings).build().process(&image).unwrap()
    }

    #[test]
    fn test_geojson_export() {
        let result = processed();
        let collection = result.to_geojson().unwrap();
        assert_eq!(collection.features.len(), result.facet_result.live_count());

        let members = collection.foreign_members.as_ref().unwrap();
        assert_eq!(members["image_width"], 10);
        assert_eq!(members["image_height"], 6);

        for feature in &collection.features {
            let properties = feature.properties.as_ref().unwrap();
            assert!(properties.contains_key("label_x"));
            assert!(properties.contains_key("label_bounds"));
            let Some(geojson::Value::Polygon(rings)) = feature.geometry.as_ref().map(|g| &g.value) else {
                panic!("expected a polygon");
            };
            assert_eq!(rings[0].first(), rings[0].last());
        }
    }

    #[test]
    fn test_geojson_string_parses() {
        let text = processed().to_geojson_string().unwrap();
        let parsed: geojson::GeoJson = text.parse().unwrap();
        assert!(matches!(parsed, geojson::GeoJson::FeatureCollection(_)));
    }
}
