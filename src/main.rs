//! # Carta CLI
//!
//! Usage:
//!   carta request.json -o layout.json
//!   echo '{ ... }' | carta -o layout.json
//!   carta --example > request.json
//!
//! The request document combines a menu, a template, and options; see
//! `carta --example` for the shape.

use std::env;
use std::fs;
use std::io::{self, Read};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_request_json());
        return;
    }

    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).expect("Failed to read input file")
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .expect("Failed to read stdin");
        buf
    };

    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "layout.json".to_string());

    match carta::generate_json(&input) {
        Ok(layout_json) => {
            fs::write(&output_path, &layout_json).expect("Failed to write layout");
            eprintln!("✓ Written {} bytes to {}", layout_json.len(), output_path);
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    }
}

fn example_request_json() -> &'static str {
    r##"{
  "menu": {
    "id": "bistro-dinner",
    "name": "Evening Menu",
    "metadata": {
      "currency": "USD",
      "venueName": "The Copper Kettle",
      "logoUrl": "https://cdn.example.com/copper-kettle/logo.png"
    },
    "categories": [
      {
        "id": "starters",
        "name": "Starters",
        "sortOrder": 1,
        "items": [
          {
            "id": "soup",
            "name": "Roasted Tomato Soup",
            "description": "Basil oil, sourdough croutons",
            "price": 9.0,
            "sortOrder": 1,
            "indicators": { "dietary": ["vegetarian"], "allergens": ["gluten"] }
          },
          {
            "id": "burrata",
            "name": "Burrata",
            "description": "Heirloom tomato, aged balsamic",
            "price": 14.0,
            "imageUrl": "https://cdn.example.com/copper-kettle/burrata.jpg",
            "sortOrder": 2,
            "indicators": { "dietary": ["vegetarian"], "allergens": ["dairy"] }
          }
        ]
      },
      {
        "id": "mains",
        "name": "Mains",
        "sortOrder": 2,
        "items": [
          {
            "id": "ribeye",
            "name": "Dry-Aged Ribeye",
            "description": "Bone marrow butter, frites",
            "price": 42.0,
            "imageUrl": "https://cdn.example.com/copper-kettle/ribeye.jpg",
            "sortOrder": 1,
            "indicators": { "spiceLevel": 0 }
          },
          {
            "id": "halibut",
            "name": "Pan-Seared Halibut",
            "description": "Brown butter, capers, fingerlings",
            "price": 36.0,
            "sortOrder": 2,
            "indicators": { "allergens": ["fish"] }
          },
          {
            "id": "curry",
            "name": "Green Coconut Curry",
            "description": "Seasonal vegetables, jasmine rice",
            "price": 24.0,
            "sortOrder": 3,
            "indicators": { "dietary": ["vegan"], "spiceLevel": 2 }
          }
        ]
      }
    ]
  },
  "template": {
    "id": "grid-classic",
    "version": "3",
    "page": {
      "width": 816,
      "height": 1056,
      "margin": { "top": 48, "right": 48, "bottom": 48, "left": 48 }
    },
    "regions": [
      { "id": "header", "band": { "type": "fixed", "height": 72, "continuationHeight": 0 } },
      { "id": "title", "band": { "type": "fixed", "height": 56, "continuationHeight": 48 } },
      { "id": "body", "band": { "type": "remainder" } },
      { "id": "footer", "band": { "type": "fixed", "height": 40 } }
    ],
    "grid": { "cols": 3, "rowHeight": 96, "gapX": 8, "gapY": 8 },
    "budgets": {
      "title": { "rows": 1, "height": 48 },
      "logo": { "rows": 1, "height": 64 },
      "sectionHeader": { "rows": 1, "height": 36 },
      "itemCard": { "rows": 2, "cols": 1, "height": 180 },
      "itemTextRow": { "rows": 1, "cols": 1, "height": 40 },
      "divider": { "rows": 1, "height": 24 },
      "textBlock": { "rows": 1, "height": 32 },
      "spacer": { "rows": 1, "cols": 1, "height": 40 }
    },
    "fillers": {
      "enabled": true,
      "mode": "Global",
      "safeZones": [
        { "startRow": "LastContent", "endRow": "Last", "startCol": 0, "endCol": 2 }
      ],
      "variants": [
        { "id": "leaf-sprig" },
        { "id": "half-opacity-block" }
      ],
      "policy": "Sequential"
    },
    "policies": {
      "lastRowBalancing": "Center",
      "stickyTitle": "All",
      "stickyLogo": "FirstOnly",
      "repeatSectionHeaders": true,
      "headerKeepWith": 2,
      "dividerBetweenSections": true
    },
    "limits": {
      "minSections": 1,
      "minItems": 1,
      "hardMaxItems": 120,
      "repeat": { "slotsPerRepeat": 12, "maxRepeats": 8 }
    },
    "statics": [
      {
        "regionId": "footer",
        "kind": { "type": "textBlock", "text": "Please inform us of any allergies." },
        "pages": "All"
      }
    ]
  },
  "options": {
    "selection": { "textOnly": false },
    "validate": false
  }
}"##
}
