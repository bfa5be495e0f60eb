pub mod app;
pub mod net;
pub(crate) mod panels;
pub mod types;
pub(crate) mod wheel;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Cap pixel ratio on high-DPI mobile devices to prevent WebGL OOM.
#[cfg(target_arch = "wasm32")]
fn capped_zoom_factor() -> f32 {
    let dpr = web_sys::window()
        .map(|w| w.device_pixel_ratio() as f32)
        .unwrap_or(1.0);
    if dpr > 2.0 { 2.0 / dpr } else { 1.0 }
}

/// `?role=overlay` loads the broadcast overlay; anything else is the admin panel.
#[cfg(target_arch = "wasm32")]
fn role_from_location() -> gamewheel::ViewerRole {
    let search = web_sys::window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default();
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "role")
        .and_then(|(_, value)| gamewheel::ViewerRole::from_query(value))
        .unwrap_or_default()
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    eframe::WebLogger::init(log::LevelFilter::Warn).ok();

    wasm_bindgen_futures::spawn_local(async {
        let Some(canvas) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("the_canvas_id"))
            .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
        else {
            log::error!("canvas #the_canvas_id not found");
            return;
        };

        let zoom = capped_zoom_factor();
        let role = role_from_location();
        log::info!("starting wheel viewer as {role}");

        if let Err(e) = eframe::WebRunner::new()
            .start(
                canvas,
                eframe::WebOptions::default(),
                Box::new(move |cc| {
                    cc.egui_ctx.set_zoom_factor(zoom);
                    Ok(Box::new(app::WheelApp::new(cc, role)))
                }),
            )
            .await
        {
            log::error!("failed to start eframe: {e:?}");
        }
    });
}
