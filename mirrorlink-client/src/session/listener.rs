/// Single callback slot. Registering replaces whatever was there.
pub struct ListenerSlot<T> {
    callback: Option<Box<dyn FnMut(T)>>,
}

impl<T> ListenerSlot<T> {
    pub fn new() -> Self {
        Self { callback: None }
    }

    pub fn set(&mut self, callback: impl FnMut(T) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear(&mut self) {
        self.callback = None;
    }

    pub fn is_set(&self) -> bool {
        self.callback.is_some()
    }

    /// Returns false when nobody is listening.
    pub fn emit(&mut self, value: T) -> bool {
        match self.callback.as_mut() {
            Some(callback) => {
                callback(value);
                true
            }
            None => false,
        }
    }
}

impl<T> Default for ListenerSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
