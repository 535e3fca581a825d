fn main() {
    gesture_quiz_lib::run()
}
