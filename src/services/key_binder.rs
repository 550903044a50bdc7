use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{KeyEvent, KeyState, Keycode, ModMask, WindowId};
use crate::keybinding::{BindingId, BindingSet, Keybinding, PartialMatch};
use crate::services::display::DisplayServer;
use crate::services::keyboard_listener::{Activation, KeyListener, KeyboardGrab, RepeatFilter};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Владеет всеми сочетаниями, захватами клавиш и автоматом их распознавания
pub struct KeybindingEngine {
    display: Arc<dyn DisplayServer>,
    bindings: BindingSet,
    listener: KeyListener,
    repeat_filter: RepeatFilter,
    keyboard_grabbed: bool,
}

impl KeybindingEngine {
    pub fn new(display: Arc<dyn DisplayServer>) -> Self {
        Self {
            display,
            bindings: BindingSet::new(),
            listener: KeyListener::new(),
            repeat_filter: RepeatFilter::new(),
            keyboard_grabbed: false,
        }
    }

    pub fn display(&self) -> &Arc<dyn DisplayServer> {
        &self.display
    }

    #[cfg(test)]

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    /// Разобрать сочетание, разрешая имена клавиш на текущей клавиатуре
    pub fn keybinding<S: AsRef<str>>(&self, symbols: &[S], target: WindowId, cyclic: bool) -> Result<Keybinding> {
        Keybinding::parse(symbols, |name| self.display.keycode(name), target, cyclic)
    }

    /// Добавить сочетание и захватить его первую клавишу, если она ещё не захвачена.
    /// При ошибке захвата сочетание не остаётся в наборе.
    pub fn bind(&mut self, binding: Keybinding) -> Result<BindingId> {
        let first = binding.first_keycode();
        let modmask = binding.modmask();
        let already_grabbed = self.bindings.find_partial(&[first], modmask) != PartialMatch::None;
        let description = binding.to_string();

        let id = self.bindings.add(binding)?;
        if already_grabbed {
            debug!("{} добавлено, клавиша уже захвачена", description);
            return Ok(id);
        }

        let grabbed = self.display.grab_key(first, modmask).and_then(|_| self.display.sync());
        if let Err(e) = grabbed {
            self.bindings.remove(id);
            return Err(e);
        }
        debug!("{} захвачено", description);
        Ok(id)
    }

    pub fn unbind(&mut self, id: BindingId) -> Result<()> {
        let Some(binding) = self.bindings.remove(id) else {
            warn!("Сочетание {} уже удалено", id);
            return Ok(());
        };
        let (first, modmask) = (binding.first_keycode(), binding.modmask());
        if self.bindings.find_partial(&[first], modmask) == PartialMatch::None {
            self.display.ungrab_key(first, modmask)?;
            debug!("{} освобождено", binding);
        }
        Ok(())
    }

    /// Удалить все сочетания и освободить все захваты
    pub fn unbind_all(&mut self) -> Result<()> {
        let grabs: BTreeSet<(Keycode, u16)> = self
            .bindings
            .iter()
            .map(|(_, kb)| (kb.first_keycode(), kb.modmask().bits()))
            .collect();
        for (keycode, modmask) in grabs {
            self.display.ungrab_key(keycode, ModMask(modmask))?;
        }
        self.bindings.clear();
        self.listener.reset(&mut self.bindings);
        self.release_keyboard()?;
        info!("Все сочетания освобождены");
        Ok(())
    }

    /// Обработать событие клавиатуры, вернуть сработавшее сочетание
    pub fn handle_key_event(&mut self, event: &KeyEvent) -> Result<Option<Activation>> {
        let reaction = match event.state {
            KeyState::Pressed => {
                if self.repeat_filter.is_fake_press(event.keycode) {
                    return Ok(None);
                }
                debug_if_enabled!("Нажатие: {}", event);
                self.listener.on_key_press(&mut self.bindings, event)
            }
            KeyState::Released => {
                let released_modifier = self.display.modifier_mask(event.keycode);
                let is_modifier = !released_modifier.is_empty();
                let still_held = !is_modifier && self.display.is_key_held(event.keycode)?;
                if self.repeat_filter.is_fake_release(event.keycode, is_modifier, still_held) {
                    return Ok(None);
                }
                debug_if_enabled!("Отпускание: {}", event);
                self.listener.on_key_release(&mut self.bindings, event, released_modifier)
            }
        };

        match reaction.grab {
            Some(KeyboardGrab::Acquire) => self.acquire_keyboard()?,
            Some(KeyboardGrab::Release) => self.release_keyboard()?,
            None => {}
        }
        Ok(reaction.activation)
    }

    fn acquire_keyboard(&mut self) -> Result<()> {
        if !self.keyboard_grabbed {
            self.display.grab_keyboard()?;
            self.keyboard_grabbed = true;
        }
        Ok(())
    }

    fn release_keyboard(&mut self) -> Result<()> {
        if self.keyboard_grabbed {
            self.display.ungrab_keyboard()?;
            self.keyboard_grabbed = false;
        }
        // После снятия захвата отпусканий уже не будет
        self.repeat_filter.clear();
        Ok(())
    }
}
