//! Legacy video demo application
//!
//! Drives the compatibility layer end to end over the headless
//! backend: sets an 8-bit video mode (forcing a shadow surface on the
//! 32-bit fake desktop), draws a test pattern, presents it, feeds a
//! few synthetic input events through the translator, and toggles
//! fullscreen.

use legacy_video::{
    Event, HeadlessBackend, KeyMods, Rect, SurfaceFlags, VideoSession, WindowEvent,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    legacy_video::foundation::logging::init();

    let backend = HeadlessBackend::new(1920, 1080);
    let mut session = VideoSession::new(Box::new(backend.clone()));
    session.set_caption("legacy video demo");

    log::info!("driver: {}", session.video_driver_name());
    let info = session.video_info();
    log::info!(
        "desktop: {}x{} at {} bpp",
        info.current_w,
        info.current_h,
        info.format.bits_per_pixel()
    );

    // An 8-bit request on a 32-bit desktop forces a shadow surface
    // with the dithered standard palette.
    let screen_id = {
        let screen = session.set_video_mode(640, 480, 8, SurfaceFlags::empty())?;
        log::info!(
            "screen: {}x{} at {} bpp, flags {:?}",
            screen.width(),
            screen.height(),
            screen.format().bits_per_pixel(),
            screen.flags()
        );

        // Horizontal bands through the 3-3-2 palette.
        for y in 0..screen.height() {
            let index = (y * 256 / screen.height()) as u32;
            screen.fill(Some(Rect::new(0, y as i32, screen.width(), 1)), index);
        }
        screen.id()
    };
    session.flip(screen_id)?;
    log::info!("presented {} rect batches", backend.present_count());

    // Synthetic input: a wheel tick and a shifted key press.
    backend.push_event(Event::Wheel { dx: 0, dy: 1 });
    backend.push_event(Event::KeyDown {
        sym: u32::from(b'q'),
        mods: KeyMods::SHIFT,
    });
    backend.push_event(Event::Window(WindowEvent::Close));

    while let Some(event) = session.poll_event() {
        log::info!("event: {event:?}");
    }

    session.toggle_fullscreen()?;
    log::info!(
        "toggled fullscreen, viewport now ({}, {})",
        session.viewport().x,
        session.viewport().y
    );
    session.toggle_fullscreen()?;
    log::info!("back to windowed");

    Ok(())
}
